//! HTTP surface for the bourse dashboard.
//!
//! Each browser tab owns a dashboard session created through the API. Events
//! posted to a session run the reactive controller on the blocking thread pool
//! and return the updated view. Sessions idle past their TTL, or pushed out
//! by the capacity bound, answer `404`.

mod config;
mod controller;
mod error;
mod response;
mod session;

pub use config::{ServerConfig, DEFAULT_BIND};
pub use controller::{create_router, serve, AppState};
pub use error::ApiError;
pub use response::{ErrorResponse, HealthResponse, SessionResponse};
pub use session::{SessionPolicy, SessionStore, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};

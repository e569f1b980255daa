//! HTTP response DTOs.

use bourse_core::DashboardView;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}

/// A session id with the view it currently shows.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub view: DashboardView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

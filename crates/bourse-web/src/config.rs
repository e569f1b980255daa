use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::session::{SessionPolicy, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};

/// Default listen address, matching the usual dashboard port.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8050);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Idle time after which a session is dropped.
    pub session_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_bind(DEFAULT_BIND)
    }
}

impl ServerConfig {
    pub fn with_bind(bind: SocketAddr) -> Self {
        Self {
            bind,
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            ttl: self.session_ttl,
            max_sessions: self.max_sessions,
        }
    }
}

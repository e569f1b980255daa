//! In-memory registry of dashboard sessions with idle expiry and a capacity
//! bound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bourse_core::DashboardSession;
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<DashboardSession>>;

/// Sessions untouched for this long are dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1_024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub ttl: Duration,
    /// Creating a session beyond this evicts the least recently used one.
    pub max_sessions: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

struct Entry {
    session: SharedSession,
    last_touched: Instant,
    /// Monotonic recency stamp; ties in `last_touched` cannot reorder eviction.
    recency: u64,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<Uuid, Entry>,
    clock: u64,
}

impl Registry {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

pub struct SessionStore {
    policy: SessionPolicy,
    registry: Mutex<Registry>,
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            registry: Mutex::default(),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_touched) >= self.policy.ttl
    }

    pub fn len(&self) -> usize {
        self.registry().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a live session and mark it as used.
    pub fn get(&self, session_id: Uuid) -> Option<SharedSession> {
        let now = Instant::now();
        let mut registry = self.registry();
        let recency = registry.tick();

        let entry = registry.entries.get_mut(&session_id)?;
        if self.is_expired(entry, now) {
            registry.entries.remove(&session_id);
            tracing::debug!(%session_id, "session expired");
            return None;
        }
        entry.last_touched = now;
        entry.recency = recency;
        Some(Arc::clone(&entry.session))
    }

    /// Register a session, evicting expired and then least recently used
    /// sessions to stay within the capacity.
    pub fn insert(&self, session_id: Uuid, session: DashboardSession) {
        let now = Instant::now();
        let mut registry = self.registry();
        self.evict_expired(&mut registry, now);

        while !registry.entries.is_empty() && registry.entries.len() >= self.policy.max_sessions {
            let oldest = registry
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.recency)
                .map(|(id, _)| *id);
            let Some(oldest) = oldest else {
                break;
            };
            registry.entries.remove(&oldest);
            tracing::info!(session_id = %oldest, "session evicted at capacity");
        }

        let recency = registry.tick();
        registry.entries.insert(
            session_id,
            Entry {
                session: Arc::new(Mutex::new(session)),
                last_touched: now,
                recency,
            },
        );
    }

    pub fn remove(&self, session_id: Uuid) -> Option<SharedSession> {
        self.registry()
            .entries
            .remove(&session_id)
            .map(|entry| entry.session)
    }

    /// Drop every expired session; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut registry = self.registry();
        self.evict_expired(&mut registry, Instant::now())
    }

    fn evict_expired(&self, registry: &mut Registry, now: Instant) -> usize {
        let before = registry.entries.len();
        registry
            .entries
            .retain(|_, entry| !self.is_expired(entry, now));
        let evicted = before - registry.entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "expired sessions dropped");
        }
        evicted
    }
}

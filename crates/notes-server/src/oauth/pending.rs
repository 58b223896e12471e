//! Short-lived OAuth request state

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};

/// Default lifetime of a pending sign-in
pub const PENDING_STATE_LIFETIME_SECS: i64 = 10 * 60;

/// Default cap on sign-ins awaiting their callback
pub const MAX_PENDING_STATES: usize = 10_000;

struct PendingState {
    pkce_verifier: String,
    expires_at: DateTime<Utc>,
}

/// Maps CSRF state -> PKCE verifier for sign-ins awaiting their callback.
///
/// Entries are single use and not persisted.
pub struct PendingStates {
    states: RwLock<HashMap<String, PendingState>>,
    lifetime: Duration,
    capacity: usize,
}

impl Default for PendingStates {
    fn default() -> Self {
        Self::new(Duration::seconds(PENDING_STATE_LIFETIME_SECS))
    }
}

impl PendingStates {
    pub fn new(lifetime: Duration) -> Self {
        Self::with_capacity(lifetime, MAX_PENDING_STATES)
    }

    pub fn with_capacity(lifetime: Duration, capacity: usize) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            lifetime,
            capacity: capacity.max(1),
        }
    }

    /// Remember a sign-in, dropping any that already expired.
    ///
    /// When the table is full the sign-in closest to expiry is evicted.
    pub fn insert(&self, state: String, pkce_verifier: String) -> anyhow::Result<()> {
        let now = Utc::now();
        let mut states = self
            .states
            .write()
            .map_err(|_| anyhow!("Pending OAuth state lock poisoned"))?;

        states.retain(|_, s| s.expires_at > now);
        while states.len() >= self.capacity {
            let Some(oldest) = states
                .iter()
                .min_by_key(|(_, s)| s.expires_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            states.remove(&oldest);
        }
        states.insert(
            state,
            PendingState {
                pkce_verifier,
                expires_at: now + self.lifetime,
            },
        );
        Ok(())
    }

    /// Consume a sign-in (returns and removes it) if it has not expired
    pub fn consume(&self, state: &str) -> Option<String> {
        let mut states = self.states.write().ok()?;
        states.remove(state).and_then(|s| {
            if s.expires_at > Utc::now() {
                Some(s.pkce_verifier)
            } else {
                None
            }
        })
    }

    pub fn len(&self) -> usize {
        self.states.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

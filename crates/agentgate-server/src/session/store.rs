//! Session store with time-based expiry.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::RwLock;

use agentgate_core::oauth::Identity;

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// A login waiting for the identity provider to redirect back.
#[derive(Debug, Clone)]
pub struct PendingAuth {
    pub code_verifier: String,
    pub created_at: u64,
}

/// An authenticated user session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub access_token: String,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    #[serde(skip)]
    pub id_token: Option<String>,
    pub identity: Identity,
    /// Client application the tokens were issued to.
    pub client_id: String,
    pub created_at: u64,
}

/// Entries removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub pending: usize,
    pub sessions: usize,
}

impl SweepStats {
    pub const fn total(self) -> usize {
        self.pending + self.sessions
    }
}

/// Process-local session store.
///
/// Every operation touches a single key, so concurrent turns never observe a
/// half-updated session.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    pending: RwLock<HashMap<String, PendingAuth>>,
    session_ttl: u64,
    pending_ttl: u64,
}

impl SessionStore {
    pub fn new(session_ttl: Duration, pending_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
            session_ttl: session_ttl.as_secs(),
            pending_ttl: pending_ttl.as_secs(),
        }
    }

    /// An entry lives for exactly `ttl` seconds and is gone the second after.
    const fn expired(created_at: u64, ttl: u64, now: u64) -> bool {
        now.saturating_sub(created_at) > ttl
    }

    // =========================================================================
    // Authenticated sessions
    // =========================================================================

    pub async fn create(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    /// Look up a live session. Expired entries read as absent even before the
    /// next sweep removes them.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.get_at(id, unix_now()).await
    }

    async fn get_at(&self, id: &str, now: u64) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|s| !Self::expired(s.created_at, self.session_ttl, now))
            .cloned()
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Replace the tokens of a session after a refresh.
    ///
    /// The refresh token is only replaced when the provider rotated it.
    pub async fn update_tokens(
        &self,
        id: &str,
        access_token: String,
        refresh_token: Option<String>,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };
        session.access_token = access_token;
        if let Some(rt) = refresh_token {
            session.refresh_token = Some(rt);
        }
        true
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    // =========================================================================
    // Pending logins
    // =========================================================================

    pub async fn insert_pending(&self, state: String, code_verifier: String) {
        self.insert_pending_at(state, code_verifier, unix_now()).await;
    }

    async fn insert_pending_at(&self, state: String, code_verifier: String, created_at: u64) {
        self.pending.write().await.insert(
            state,
            PendingAuth {
                code_verifier,
                created_at,
            },
        );
    }

    /// Remove and return the pending login for `state`, if still live.
    pub async fn take_pending(&self, state: &str) -> Option<PendingAuth> {
        self.take_pending_at(state, unix_now()).await
    }

    async fn take_pending_at(&self, state: &str, now: u64) -> Option<PendingAuth> {
        self.pending
            .write()
            .await
            .remove(state)
            .filter(|p| !Self::expired(p.created_at, self.pending_ttl, now))
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    /// Drop every entry older than its lifetime at `now`.
    pub async fn sweep(&self, now: u64) -> SweepStats {
        let pending = {
            let mut map = self.pending.write().await;
            let before = map.len();
            map.retain(|_, p| !Self::expired(p.created_at, self.pending_ttl, now));
            before - map.len()
        };
        let sessions = {
            let mut map = self.sessions.write().await;
            let before = map.len();
            map.retain(|_, s| !Self::expired(s.created_at, self.session_ttl, now));
            before - map.len()
        };
        SweepStats { pending, sessions }
    }
}

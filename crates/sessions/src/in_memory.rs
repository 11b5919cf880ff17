//! In-memory session store. Process-local, lost on restart.

use async_trait::async_trait;
use sera_core::error::StoreError;
use sera_core::session::{Session, SessionId};
use sera_core::store::SessionStore;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// A bounded map of sessions.
///
/// When full, saving a new session evicts the one updated longest ago.
/// Saving an empty session drops the entry entirely.
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    max_sessions: usize,
}

impl InMemoryStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, id: &SessionId) -> Result<Session, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .cloned()
            .unwrap_or_else(|| Session::new(id.clone())))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;

        if session.is_empty() {
            sessions.remove(&session.id);
            return Ok(());
        }

        // Evict the stalest session if at capacity
        if sessions.len() >= self.max_sessions && !sessions.contains_key(&session.id) {
            if let Some(stalest) = sessions
                .values()
                .min_by_key(|s| s.updated_at)
                .map(|s| s.id.clone())
            {
                warn!(
                    session = %stalest,
                    max_sessions = self.max_sessions,
                    "Session store full, evicting least recently updated session"
                );
                sessions.remove(&stalest);
            }
        }

        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.sessions.read().await.len())
    }
}

//! SessionStore trait: ownership of persisted dialogue history.
//!
//! The store is the single owner of session data. Callers load a copy,
//! mutate it privately, and save it back whole.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::{Session, SessionId};

/// The core SessionStore trait.
///
/// Implementations: in-memory (bounded map), JSON file per session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Load a session. An unseen id yields a fresh, empty session.
    async fn load(&self, id: &SessionId) -> std::result::Result<Session, StoreError>;

    /// Replace the stored session with `session`.
    ///
    /// Saving an empty session is how a reset is expressed.
    async fn save(&self, session: &Session) -> std::result::Result<(), StoreError>;

    /// Number of sessions currently held.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}

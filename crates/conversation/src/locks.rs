//! Per-session serialization.
//!
//! Two exchanges on the same session must not interleave their
//! load/append/save sequences, otherwise one of the two pairs is lost.
//! Exchanges on different sessions never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sera_core::session::SessionId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Table size above which idle entries are dropped on the next acquire.
const PRUNE_THRESHOLD: usize = 256;

/// One async mutex per session id, created on demand.
#[derive(Default)]
pub struct SessionLocks {
    table: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn acquire(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            if table.len() > PRUNE_THRESHOLD {
                // Only the table holds a reference: nobody is waiting or inside
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            table
                .entry(id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

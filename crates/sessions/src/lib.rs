//! Session store implementations for Sera.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

use std::sync::Arc;

use sera_config::SessionsConfig;
use sera_core::store::SessionStore;
use tracing::info;

/// Open the store selected by `sessions.backend`.
///
/// Unknown backends are rejected by config validation, so anything other
/// than `"file"` is the in-memory store.
pub fn open(config: &SessionsConfig) -> Arc<dyn SessionStore> {
    match config.backend.as_str() {
        "file" => {
            let dir = config.resolved_path();
            info!(path = %dir.display(), "Using file session store");
            Arc::new(FileStore::new(dir))
        }
        _ => {
            info!(max_sessions = config.max_sessions, "Using in-memory session store");
            Arc::new(InMemoryStore::new(config.max_sessions))
        }
    }
}

//! File-based session store, one JSON document per session.
//!
//! Storage location: `~/.sera/sessions/<session-id>.json` by default.
//! Session ids are restricted to `[A-Za-z0-9_-]`, so the id is used as the
//! file stem directly.

use async_trait::async_trait;
use sera_core::error::StoreError;
use sera_core::session::{Session, SessionId};
use sera_core::store::SessionStore;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A directory of JSON session files.
///
/// Every save rewrites the whole document through a temporary file and a
/// rename, so a crash never leaves half a history behind.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(path = %dir.display(), "File session store opened");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, id: &SessionId) -> Result<Session, StoreError> {
        let path = self.path_for(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Session::new(id.clone()));
            }
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let session: Session = serde_json::from_str(&content).map_err(|e| {
            warn!(session = %id, error = %e, "Stored session failed to parse");
            StoreError::Corrupted {
                session_id: id.to_string(),
                reason: e.to_string(),
            }
        })?;

        if session.id != *id {
            return Err(StoreError::Corrupted {
                session_id: id.to_string(),
                reason: format!("file holds session '{}'", session.id),
            });
        }

        Ok(session)
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let path = self.path_for(&session.id);

        if session.is_empty() {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::Storage(format!(
                    "Failed to remove {}: {e}",
                    path.display()
                ))),
            };
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Storage(format!("Failed to create session directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(session)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize session: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write session file: {e}")))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace session file: {e}")))?;

        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        };

        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?
        {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sera_core::session::Speaker;

    fn id(s: &str) -> SessionId {
        SessionId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn missing_file_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("sessions"));
        assert!(store.load(&id("nobody")).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(id("s1"));
        session.append(Speaker::User, "I had a rough day").unwrap();
        session.append(Speaker::Assistant, "I'm sorry to hear that.").unwrap();

        FileStore::new(dir.path()).save(&session).await.unwrap();

        let reopened = FileStore::new(dir.path());
        let loaded = reopened.load(&id("s1")).await.unwrap();
        assert_eq!(loaded.snapshot(), session.snapshot());
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_save_deletes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut session = Session::new(id("s1"));
        session.append(Speaker::User, "hello").unwrap();
        store.save(&session).await.unwrap();

        store.save(&Session::new(id("s1"))).await.unwrap();
        store.save(&Session::new(id("s1"))).await.unwrap();
        assert!(!dir.path().join("s1.json").exists());
        assert!(store.load(&id("s1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();

        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.load(&id("bad")).await,
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn empty_turn_on_disk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"id":"s1","turns":[{"speaker":"user","text":""}],"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#;
        std::fs::write(dir.path().join("s1.json"), json).unwrap();

        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.load(&id("s1")).await,
            Err(StoreError::Corrupted { .. })
        ));
    }
}

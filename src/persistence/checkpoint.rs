//! Durable checkpoint store: entity name → last seen change token.
//!
//! The store lives in memory behind a single async mutex and is flushed to a
//! pretty-printed JSON object on disk:
//!
//! ```text
//! {
//!   "Dota 2": "5129046713839402381",
//!   "Portal 2": "5124543104446358744"
//! }
//! ```
//!
//! # Invariants
//!
//! - An absent entry means the entity has never been scanned successfully.
//! - Entries are only written after a successful classification, so a failed
//!   fetch never disturbs the baseline.
//! - Flushes replace the file atomically (see [`super::atomic`]); a crash
//!   leaves either the previous or the new map on disk, never a torn one.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::atomic::write_atomic;
use crate::types::{ChangeToken, EntityName};

/// Errors that can occur while loading or flushing checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// IO error during file operations.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The checkpoint file exists but is not a JSON string map.
    #[error("malformed checkpoint file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

#[derive(Debug, Default)]
struct Entries {
    tokens: BTreeMap<EntityName, ChangeToken>,
    /// Set when `tokens` differs from what was last written to disk.
    dirty: bool,
}

/// Shared handle to the checkpoint map.
///
/// Cloning the handle is cheap; all clones see the same entries.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: Arc<PathBuf>,
    entries: Arc<Mutex<Entries>>,
}

impl CheckpointStore {
    /// Opens the store backed by `path`.
    ///
    /// A missing file is a cold start and yields an empty store. A file that
    /// exists but cannot be read or parsed is an error: overwriting it would
    /// silently reset every baseline.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<EntityName, ChangeToken>>(&bytes)
                .map_err(|source| CheckpointError::Json {
                    path: path.clone(),
                    source,
                })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No checkpoint file, starting cold");
                BTreeMap::new()
            }
            Err(source) => return Err(CheckpointError::Io { path, source }),
        };

        if !tokens.is_empty() {
            info!(path = %path.display(), entries = tokens.len(), "Loaded checkpoints");
        }

        Ok(CheckpointStore {
            path: Arc::new(path),
            entries: Arc::new(Mutex::new(Entries {
                tokens,
                dirty: false,
            })),
        })
    }

    /// Returns the file this store flushes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the recorded token for `name`, if the entity was ever scanned.
    pub async fn get(&self, name: &EntityName) -> Option<ChangeToken> {
        self.entries.lock().await.tokens.get(name).cloned()
    }

    /// Records `token` for `name`, returning the previous token.
    ///
    /// The write is in memory only until the next [`flush`](Self::flush).
    pub async fn record(&self, name: EntityName, token: ChangeToken) -> Option<ChangeToken> {
        let mut entries = self.entries.lock().await;
        let previous = entries.tokens.insert(name, token.clone());
        if previous.as_ref() != Some(&token) {
            entries.dirty = true;
        }
        previous
    }

    /// Returns the number of entities with a checkpoint.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.tokens.len()
    }

    /// Returns true if no entity has a checkpoint yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.tokens.is_empty()
    }

    /// Returns true if there are writes not yet flushed to disk.
    pub async fn is_dirty(&self) -> bool {
        self.entries.lock().await.dirty
    }

    /// Writes the map to disk if anything changed since the last flush.
    ///
    /// Returns `true` if a write happened. The lock is held for the duration
    /// of the write so concurrent flushes can never reorder on disk.
    pub async fn flush(&self) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if !entries.dirty {
            return Ok(false);
        }

        let bytes =
            serde_json::to_vec_pretty(&entries.tokens).map_err(|source| CheckpointError::Json {
                path: self.path.to_path_buf(),
                source,
            })?;
        write_atomic(&self.path, &bytes).map_err(|source| CheckpointError::Io {
            path: self.path.to_path_buf(),
            source,
        })?;
        entries.dirty = false;

        debug!(entries = entries.tokens.len(), "Flushed checkpoints");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_cold_start() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("state.json")).unwrap();

        assert!(store.is_empty().await);
        assert!(!store.is_dirty().await);
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"[1, 2, 3]").unwrap();

        let err = CheckpointStore::open(&path).unwrap_err();

        assert!(matches!(err, CheckpointError::Json { .. }));
    }

    #[tokio::test]
    async fn record_returns_previous_token() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("state.json")).unwrap();
        let name = EntityName::new("Dota 2");

        assert_eq!(store.record(name.clone(), "a".into()).await, None);
        assert_eq!(
            store.record(name.clone(), "b".into()).await,
            Some(ChangeToken::new("a"))
        );
        assert_eq!(store.get(&name).await, Some(ChangeToken::new("b")));
    }

    #[tokio::test]
    async fn rewriting_same_token_does_not_dirty() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("state.json")).unwrap();
        let name = EntityName::new("Dota 2");
        store.record(name.clone(), "a".into()).await;
        store.flush().await.unwrap();

        store.record(name, "a".into()).await;

        assert!(!store.is_dirty().await);
    }

    #[tokio::test]
    async fn flush_then_reopen_restores_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = CheckpointStore::open(&path).unwrap();
        store.record("Dota 2".into(), "111".into()).await;
        store.record("Portal 2".into(), "222".into()).await;

        assert!(store.flush().await.unwrap());

        let reopened = CheckpointStore::open(&path).unwrap();
        assert_eq!(reopened.len().await, 2);
        assert_eq!(
            reopened.get(&"Portal 2".into()).await,
            Some(ChangeToken::new("222"))
        );
    }

    #[tokio::test]
    async fn clean_flush_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = CheckpointStore::open(&path).unwrap();

        assert!(!store.flush().await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn file_is_a_plain_name_to_token_map() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = CheckpointStore::open(&path).unwrap();
        store.record("Dota 2".into(), "111".into()).await;
        store.flush().await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();

        assert_eq!(value, serde_json::json!({"Dota 2": "111"}));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("state.json")).unwrap();
        let other = store.clone();

        other.record("Dota 2".into(), "1".into()).await;

        assert_eq!(store.len().await, 1);
        assert!(store.is_dirty().await);
    }

    #[tokio::test]
    async fn failed_flush_stays_dirty_and_next_flush_retries() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let path = state_dir.join("state.json");
        let store = CheckpointStore::open(&path).unwrap();
        store.record("Dota 2".into(), "111".into()).await;
        // A plain file where the state directory should be.
        std::fs::write(&state_dir, b"").unwrap();

        let err = store.flush().await.unwrap_err();
        assert!(matches!(err, CheckpointError::Io { .. }), "{err}");
        assert!(store.is_dirty().await);

        std::fs::remove_file(&state_dir).unwrap();
        assert!(store.flush().await.unwrap());
        assert!(!store.is_dirty().await);

        let reopened = CheckpointStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(&EntityName::new("Dota 2")).await,
            Some(ChangeToken::new("111"))
        );
    }
}

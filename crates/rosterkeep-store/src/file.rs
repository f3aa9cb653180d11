//! Durable, file-backed history store.
//!
//! [`FileStore`] owns `<dir>/history.json`. Reads degrade to an empty
//! document on any problem; writes go through a temp file and a rename
//! so a concurrent reader sees either the old or the new content.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::HistoryDocument;
use crate::error::{StoreError, StoreResult};

/// Fixed name of the durable record inside the configured directory.
pub const HISTORY_FILE_NAME: &str = "history.json";

/// File-backed store for the history document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(HISTORY_FILE_NAME);
        Self { dir, path }
    }

    /// Directory holding the record.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of `history.json`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored document.
    ///
    /// Missing or blank files yield an empty document. Unreadable or
    /// unparsable files are logged and also yield an empty document.
    pub async fn load(&self) -> HistoryDocument {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history file yet");
                return HistoryDocument::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read history file");
                return HistoryDocument::new();
            }
        };

        if raw.trim().is_empty() {
            return HistoryDocument::new();
        }

        match HistoryDocument::from_json(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "history file is corrupt, serving empty history");
                HistoryDocument::new()
            }
        }
    }

    /// Serialize `doc` and persist it.
    pub async fn save(&self, doc: &HistoryDocument) -> StoreResult<()> {
        let encoded = doc.to_pretty_json()?;
        self.save_encoded(&encoded).await
    }

    /// Persist an already serialized document.
    ///
    /// On success the file holds exactly `encoded`. On failure the previous
    /// content is left in place.
    pub async fn save_encoded(&self, encoded: &str) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let tmp = self
            .dir
            .join(format!(".{HISTORY_FILE_NAME}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, encoded).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(&tmp, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(&self.path, e));
        }

        info!(path = %self.path.display(), bytes = encoded.len(), "history saved");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────

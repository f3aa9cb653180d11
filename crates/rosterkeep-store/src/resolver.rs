//! Read/save policy across the cache and durable tiers.
//!
//! Reads prefer the cache and fall back to the file, then to an empty
//! document. Saves write the cache best-effort and the file
//! unconditionally; only the file write can fail a save.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheLookup, CacheWrite, HistoryCache};
use crate::document::HistoryDocument;
use crate::error::StoreResult;
use crate::file::FileStore;

/// Cache key holding the serialized history document.
pub const HISTORY_KEY: &str = "history";

/// What happened on a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Whether the cache accepted the new document.
    pub cache: CacheWrite,
}

/// Composes a [`HistoryCache`] and a [`FileStore`] into the history API.
///
/// Cheap to clone; clones share the same cache connection.
#[derive(Clone)]
pub struct HistoryResolver {
    cache: Arc<dyn HistoryCache>,
    file: FileStore,
}

impl HistoryResolver {
    pub fn new(cache: Arc<dyn HistoryCache>, file: FileStore) -> Self {
        Self { cache, file }
    }

    pub fn file(&self) -> &FileStore {
        &self.file
    }

    pub fn cache(&self) -> &dyn HistoryCache {
        self.cache.as_ref()
    }

    /// Resolve the current history. Never fails.
    pub async fn read(&self) -> HistoryDocument {
        match self.cache.get(HISTORY_KEY).await {
            CacheLookup::Found(raw) => match HistoryDocument::from_json(&raw) {
                Ok(doc) => {
                    debug!(cache = self.cache.name(), "history served from cache");
                    return doc;
                }
                Err(e) => {
                    warn!(
                        cache = self.cache.name(),
                        error = %e,
                        "cached history is corrupt, falling back to file"
                    );
                }
            },
            CacheLookup::Absent => {
                debug!(cache = self.cache.name(), "history not cached, reading file");
            }
            CacheLookup::Unavailable => {
                debug!(cache = self.cache.name(), "cache unavailable, reading file");
            }
        }

        self.file.load().await
    }

    /// Persist `doc`.
    ///
    /// The document is serialized once and the same text goes to both
    /// tiers. A cache failure is reported in the outcome; a file failure
    /// is returned as an error.
    pub async fn save(&self, doc: &HistoryDocument) -> StoreResult<SaveOutcome> {
        let encoded = doc.to_pretty_json()?;

        let cache = self.cache.set(HISTORY_KEY, &encoded).await;
        if cache == CacheWrite::Unavailable {
            debug!(cache = self.cache.name(), "cache write skipped, continuing with file");
        }

        self.file.save_encoded(&encoded).await?;

        Ok(SaveOutcome { cache })
    }
}

impl std::fmt::Debug for HistoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryResolver")
            .field("cache", &self.cache.name())
            .field("file", &self.file.path())
            .finish()
    }
}

// ── tests ────────────────────────────────────────────────────────────

//! # rosterkeep-store
//!
//! Persistence for the rosterkeep history document.
//!
//! Reads and writes go through a two-tier stack: a Redis cache that is
//! tried first and may be missing, stale, or unreachable, and a JSON file
//! on local disk that is the record of truth.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  HistoryResolver (read / save policy)    │
//! ├────────────────────┬────────────────────┤
//! │  HistoryCache      │  FileStore          │
//! │  (Redis, optional) │  (history.json)     │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rosterkeep_store::{CacheConfig, FileStore, HistoryResolver, RedisCache};
//!
//! let cache = RedisCache::new(&CacheConfig::default())?;
//! let resolver = HistoryResolver::new(Arc::new(cache), FileStore::new("output"));
//! let doc = resolver.read().await;
//! resolver.save(&doc).await?;
//! ```

pub mod cache;
pub mod document;
pub mod error;
pub mod file;
pub mod resolver;

// ── re-exports ───────────────────────────────────────────────────────

pub use cache::{CacheConfig, CacheLookup, CacheWrite, DisabledCache, HistoryCache, RedisCache};
pub use document::HistoryDocument;
pub use error::{StoreError, StoreResult};
pub use file::{FileStore, HISTORY_FILE_NAME};
pub use resolver::{HISTORY_KEY, HistoryResolver, SaveOutcome};

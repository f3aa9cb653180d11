//! Integration tests for the rosterkeep-store crate.
//!
//! These tests drive [`HistoryResolver`] against an on-disk [`FileStore`]
//! (via tempfile) and in-process fake caches that simulate a healthy,
//! unreachable, or corrupt cache tier.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use rosterkeep_store::{
    CacheLookup, CacheWrite, DisabledCache, FileStore, HISTORY_KEY, HistoryCache, HistoryDocument,
    HistoryResolver, StoreError,
};

// ═══════════════════════════════════════════════════════════════════════
//  Fake caches
// ═══════════════════════════════════════════════════════════════════════

/// A healthy in-memory cache.
#[derive(Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn put(&self, key: &str, value: &str) {
        self.entries.lock().await.insert(key.to_string(), value.to_string());
    }

    async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[async_trait]
impl HistoryCache for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheLookup {
        match self.raw(key).await {
            Some(value) if !value.is_empty() => CacheLookup::Found(value),
            _ => CacheLookup::Absent,
        }
    }

    async fn set(&self, key: &str, value: &str) -> CacheWrite {
        self.put(key, value).await;
        CacheWrite::Stored
    }
}

/// A cache whose server is down; counts how often it was asked.
#[derive(Default)]
struct DownCache {
    gets: AtomicUsize,
    sets: AtomicUsize,
}

#[async_trait]
impl HistoryCache for DownCache {
    fn name(&self) -> &str {
        "down"
    }

    async fn get(&self, _key: &str) -> CacheLookup {
        self.gets.fetch_add(1, Ordering::SeqCst);
        CacheLookup::Unavailable
    }

    async fn set(&self, _key: &str, _value: &str) -> CacheWrite {
        self.sets.fetch_add(1, Ordering::SeqCst);
        CacheWrite::Unavailable
    }
}

fn sample() -> HistoryDocument {
    HistoryDocument::try_from(json!({"emp1": {"2025-week-01": {"Mon": "Onsite"}}})).unwrap()
}

fn doc(value: serde_json::Value) -> HistoryDocument {
    HistoryDocument::try_from(value).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
//  Empty state
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn fresh_system_reads_empty_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MemoryCache::default());
    let resolver = HistoryResolver::new(cache, FileStore::new(dir.path()));

    let history = resolver.read().await;
    assert!(history.is_empty());
    assert_eq!(serde_json::to_string(&history).unwrap(), "{}");
}

#[tokio::test]
async fn read_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = HistoryResolver::new(Arc::new(MemoryCache::default()), FileStore::new(dir.path()));
    resolver.save(&sample()).await.unwrap();

    let first = resolver.read().await;
    let second = resolver.read().await;
    assert_eq!(first, second);
}

// ═══════════════════════════════════════════════════════════════════════
//  Save path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn save_with_cache_disabled_persists_exact_document() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = HistoryResolver::new(Arc::new(DisabledCache), FileStore::new(dir.path()));

    resolver.save(&sample()).await.unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("history.json")).unwrap())
            .unwrap();
    assert_eq!(on_disk, json!({"emp1": {"2025-week-01": {"Mon": "Onsite"}}}));
    assert_eq!(resolver.read().await, sample());
}

#[tokio::test]
async fn cache_write_failure_does_not_block_save() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(DownCache::default());
    let resolver = HistoryResolver::new(cache.clone(), FileStore::new(dir.path()));

    let outcome = resolver.save(&sample()).await.unwrap();

    assert_eq!(outcome.cache, CacheWrite::Unavailable);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.file().load().await, sample());
}

#[tokio::test]
async fn healthy_cache_receives_same_encoding_as_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MemoryCache::default());
    let resolver = HistoryResolver::new(cache.clone(), FileStore::new(dir.path()));

    let outcome = resolver.save(&sample()).await.unwrap();
    assert_eq!(outcome.cache, CacheWrite::Stored);

    let cached = cache.raw(HISTORY_KEY).await.unwrap();
    let on_disk = std::fs::read_to_string(resolver.file().path()).unwrap();
    assert_eq!(cached, on_disk);
}

#[tokio::test]
async fn durable_write_failure_fails_save() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("output");
    std::fs::write(&blocker, "a file, not a directory").unwrap();

    let cache = Arc::new(MemoryCache::default());
    let resolver = HistoryResolver::new(cache.clone(), FileStore::new(&blocker));

    let err = resolver.save(&sample()).await.unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[tokio::test]
async fn last_save_wins() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = HistoryResolver::new(Arc::new(DisabledCache), FileStore::new(dir.path()));

    resolver.save(&doc(json!({"emp1": {"Mon": "Onsite"}}))).await.unwrap();
    resolver.save(&doc(json!({"emp1": {"Mon": "Remote"}}))).await.unwrap();

    assert_eq!(resolver.read().await, doc(json!({"emp1": {"Mon": "Remote"}})));
}

#[tokio::test]
async fn concurrent_saves_leave_one_complete_document() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = HistoryResolver::new(Arc::new(DisabledCache), FileStore::new(dir.path()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            let d = doc(json!({ (format!("emp{i}")): {"Mon": "Onsite"} }));
            resolver.save(&d).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let history = resolver.read().await;
    assert_eq!(history.len(), 1);
    let key = history.as_map().keys().next().unwrap();
    assert!(key.starts_with("emp"));

    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Read path fallback
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unreachable_cache_falls_back_to_file() {
    let dir = tempfile::tempdir().unwrap();
    FileStore::new(dir.path()).save(&sample()).await.unwrap();

    let cache = Arc::new(DownCache::default());
    let resolver = HistoryResolver::new(cache.clone(), FileStore::new(dir.path()));

    assert_eq!(resolver.read().await, sample());
    assert_eq!(cache.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn durability_survives_cache_loss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MemoryCache::default());
    let resolver = HistoryResolver::new(cache.clone(), FileStore::new(dir.path()));

    resolver.save(&sample()).await.unwrap();
    cache.clear().await;

    assert_eq!(resolver.read().await, sample());
}

#[tokio::test]
async fn cache_hit_is_preferred_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    file.save(&doc(json!({"source": "file"}))).await.unwrap();

    let cache = Arc::new(MemoryCache::default());
    cache.put(HISTORY_KEY, r#"{"source": "cache"}"#).await;
    let resolver = HistoryResolver::new(cache, file);

    assert_eq!(resolver.read().await, doc(json!({"source": "cache"})));
}

#[tokio::test]
async fn corrupt_cache_value_falls_back_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    file.save(&sample()).await.unwrap();

    let cache = Arc::new(MemoryCache::default());
    cache.put(HISTORY_KEY, "{not json").await;
    let resolver = HistoryResolver::new(cache, file);

    assert_eq!(resolver.read().await, sample());
}

#[tokio::test]
async fn non_object_cache_value_falls_back_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    file.save(&sample()).await.unwrap();

    let cache = Arc::new(MemoryCache::default());
    cache.put(HISTORY_KEY, "[\"not\", \"a\", \"map\"]").await;
    let resolver = HistoryResolver::new(cache, file);

    assert_eq!(resolver.read().await, sample());
}

#[tokio::test]
async fn empty_cache_value_falls_back_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    file.save(&sample()).await.unwrap();

    let cache = Arc::new(MemoryCache::default());
    cache.put(HISTORY_KEY, "").await;
    let resolver = HistoryResolver::new(cache, file);

    assert_eq!(resolver.read().await, sample());
}

#[tokio::test]
async fn corrupt_file_with_down_cache_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("history.json"), "<<<garbage>>>").unwrap();

    let resolver = HistoryResolver::new(Arc::new(DownCache::default()), FileStore::new(dir.path()));
    assert!(resolver.read().await.is_empty());
}

#[tokio::test]
async fn stale_cache_after_failed_cache_write_wins_on_read() {
    // Cache and file diverge when a cache write fails but a later read
    // reaches the cache. Reads trust a parsable cache value.
    let dir = tempfile::tempdir().unwrap();
    let file = FileStore::new(dir.path());
    let cache = Arc::new(MemoryCache::default());
    cache.put(HISTORY_KEY, r#"{"emp1": {"Mon": "Onsite"}}"#).await;

    file.save(&doc(json!({"emp1": {"Mon": "Remote"}}))).await.unwrap();

    let resolver = HistoryResolver::new(cache, file);
    assert_eq!(resolver.read().await, doc(json!({"emp1": {"Mon": "Onsite"}})));
}

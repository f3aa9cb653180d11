//! Cache tier for the history document.
//!
//! The cache is an accelerator, never a source of truth. Every
//! implementation of [`HistoryCache`] reports failures as outcomes
//! ([`CacheLookup::Unavailable`], [`CacheWrite::Unavailable`]) instead of
//! errors, so callers can fall back without matching on error kinds.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{StoreError, StoreResult};

// ── outcomes ─────────────────────────────────────────────────────────

/// Result of reading a key from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The key holds a non-empty value.
    Found(String),
    /// The cache answered, but the key is missing or empty.
    Absent,
    /// The cache could not be reached or the command failed.
    Unavailable,
}

/// Result of writing a key to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Stored,
    Unavailable,
}

impl fmt::Display for CacheWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

// ── trait ────────────────────────────────────────────────────────────

/// A single-namespace string cache.
///
/// Implementations must never panic or return errors; every failure
/// collapses into the `Unavailable` variant of the outcome.
#[async_trait]
pub trait HistoryCache: Send + Sync {
    /// Short label used in log fields.
    fn name(&self) -> &str;

    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> CacheLookup;

    /// Overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> CacheWrite;
}

// ── config ───────────────────────────────────────────────────────────

/// Connection target and timeouts for [`RedisCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    /// Optional `AUTH` password. An empty string is treated as none.
    pub password: Option<String>,
    /// Upper bound on establishing a connection.
    pub connect_timeout: Duration,
    /// Upper bound on a single `GET`/`SET` round trip.
    pub op_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            connect_timeout: Duration::from_secs(2),
            op_timeout: Duration::from_secs(2),
        }
    }
}

impl CacheConfig {
    /// Build the `redis://` URL, percent-encoding the password.
    pub fn url(&self) -> StoreResult<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let mut url = Url::parse(&format!("redis://{host}:{}", self.port))
            .map_err(|e| StoreError::InvalidConfig(format!("{host}:{}: {e}", self.port)))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|()| StoreError::InvalidConfig("cannot set password on url".into()))?;
        }
        Ok(url)
    }

    /// `host:port`, safe to log.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── redis ────────────────────────────────────────────────────────────

/// One connection attempt, awaited by every caller that arrives while it
/// is in flight.
type ConnectAttempt = Shared<BoxFuture<'static, Option<MultiplexedConnection>>>;

/// A live connection tagged with the generation that installed it.
#[derive(Clone)]
struct Connected {
    generation: u64,
    conn: MultiplexedConnection,
}

#[derive(Default)]
struct Slot {
    current: Option<Connected>,
    pending: Option<ConnectAttempt>,
    generation: u64,
}

/// Redis-backed cache with a lazily established, shared connection.
///
/// The slot lock is never held across network I/O. Concurrent callers
/// that find no connection all await the same in-flight attempt, so a
/// hanging server costs each of them at most one `connect_timeout`. A
/// failed command clears the slot only if it still holds the connection
/// that failed.
pub struct RedisCache {
    client: redis::Client,
    target: String,
    connect_timeout: Duration,
    op_timeout: Duration,
    slot: Mutex<Slot>,
}

impl RedisCache {
    /// Create the cache handle. No network I/O happens until first use.
    pub fn new(config: &CacheConfig) -> StoreResult<Self> {
        let url = config.url()?;
        let client = redis::Client::open(url.as_str())
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        debug!(addr = %config.target(), "redis cache configured");

        Ok(Self {
            client,
            target: config.target(),
            connect_timeout: config.connect_timeout,
            op_timeout: config.op_timeout,
            slot: Mutex::new(Slot::default()),
        })
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.slot().current.is_some()
    }

    /// Connect if not already connected.
    ///
    /// Returns whether a connection is available afterwards. Failures are
    /// logged, never returned.
    pub async fn connect(&self) -> bool {
        self.connection().await.is_some()
    }

    async fn connection(&self) -> Option<Connected> {
        let attempt = {
            let mut slot = self.slot();
            if let Some(current) = &slot.current {
                return Some(current.clone());
            }
            match &slot.pending {
                Some(pending) => pending.clone(),
                None => {
                    let attempt = self.start_attempt();
                    slot.pending = Some(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;

        let mut slot = self.slot();
        if slot.pending.as_ref().is_some_and(|p| p.ptr_eq(&attempt)) {
            slot.pending = None;
            if let Some(conn) = result {
                slot.generation += 1;
                let generation = slot.generation;
                slot.current = Some(Connected { generation, conn });
            }
        }
        slot.current.clone()
    }

    fn start_attempt(&self) -> ConnectAttempt {
        let client = self.client.clone();
        let target = self.target.clone();
        let connect_timeout = self.connect_timeout;

        async move {
            match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(Ok(conn)) => {
                    info!(addr = %target, "connected to redis");
                    Some(conn)
                }
                Ok(Err(e)) => {
                    warn!(addr = %target, error = %e, "failed to connect to redis");
                    None
                }
                Err(_) => {
                    warn!(
                        addr = %target,
                        timeout_ms = connect_timeout.as_millis() as u64,
                        "timed out connecting to redis"
                    );
                    None
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drop the connection of `generation` so the next call reconnects.
    /// A newer connection installed meanwhile is kept.
    fn reset(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.current.as_ref().is_some_and(|c| c.generation == generation) {
            slot.current = None;
        }
    }
}

#[async_trait]
impl HistoryCache for RedisCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheLookup {
        let Some(Connected { generation, mut conn }) = self.connection().await else {
            return CacheLookup::Unavailable;
        };

        match timeout(self.op_timeout, conn.get::<_, Option<String>>(key)).await {
            Ok(Ok(Some(value))) if !value.is_empty() => {
                debug!(key, bytes = value.len(), "redis hit");
                CacheLookup::Found(value)
            }
            Ok(Ok(_)) => {
                debug!(key, "redis miss");
                CacheLookup::Absent
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "redis read failed");
                self.reset(generation);
                CacheLookup::Unavailable
            }
            Err(_) => {
                warn!(key, timeout_ms = self.op_timeout.as_millis() as u64, "redis read timed out");
                self.reset(generation);
                CacheLookup::Unavailable
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> CacheWrite {
        let Some(Connected { generation, mut conn }) = self.connection().await else {
            return CacheWrite::Unavailable;
        };

        match timeout(self.op_timeout, conn.set::<_, _, ()>(key, value)).await {
            Ok(Ok(())) => {
                debug!(key, bytes = value.len(), "redis write");
                CacheWrite::Stored
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "redis write failed");
                self.reset(generation);
                CacheWrite::Unavailable
            }
            Err(_) => {
                warn!(key, timeout_ms = self.op_timeout.as_millis() as u64, "redis write timed out");
                self.reset(generation);
                CacheWrite::Unavailable
            }
        }
    }
}

// ── disabled ─────────────────────────────────────────────────────────

/// A cache that is switched off: every lookup and write is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl HistoryCache for DisabledCache {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn get(&self, key: &str) -> CacheLookup {
        debug!(key, "cache disabled, skipping read");
        CacheLookup::Unavailable
    }

    async fn set(&self, key: &str, _value: &str) -> CacheWrite {
        debug!(key, "cache disabled, skipping write");
        CacheWrite::Unavailable
    }
}

// ── tests ────────────────────────────────────────────────────────────

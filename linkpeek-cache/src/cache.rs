//! URL-keyed metadata cache with a fixed TTL.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use linkpeek_core::constants::{CACHE_KEY_PREFIX, DEFAULT_CACHE_TTL_SECONDS};
use linkpeek_core::error::Result;
use linkpeek_core::{CacheStore, Clock, MetadataRecord, SystemClock};

use crate::store::MemoryStore;

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL in seconds applied to every record
    pub ttl_seconds: u64,
    /// Prefix of every store key
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            namespace: CACHE_KEY_PREFIX.into(),
        }
    }
}

impl CacheConfig {
    /// Default configuration with a different TTL.
    pub fn with_ttl_seconds(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            ..Default::default()
        }
    }
}

/// Metadata cache keyed by normalized URL.
///
/// A record is returned only while `now < expires_at`. Expired records are
/// left in the store until the next `put` for the same URL overwrites them;
/// nothing sweeps in the background and nothing is evicted for size.
pub struct MetaCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl MetaCache {
    /// Creates an in-memory cache with default configuration.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), CacheConfig::default())
    }

    /// Creates a cache over `store`.
    pub fn with_store(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replaces the clock used for freshness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// TTL applied to new records.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_seconds as i64)
    }

    /// Current time according to the cache's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Expiry for a record created now.
    pub fn expiry_from_now(&self) -> DateTime<Utc> {
        self.now() + self.ttl()
    }

    /// Gets the fresh record for `url`.
    ///
    /// Returns None if not cached, expired, or unreadable.
    pub fn get(&self, url: &str) -> Option<MetadataRecord> {
        let key = self.key(url);

        let raw = match self.store.load(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache store read failed");
                return None;
            }
        };

        let record: MetadataRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                return None;
            }
        };

        if record.is_fresh_at(self.now()) {
            Some(record)
        } else {
            debug!(key, expires_at = %record.expires_at, "Cache entry expired");
            None
        }
    }

    /// Stores `record` for `url`, replacing any previous entry.
    pub fn put(&self, url: &str, record: &MetadataRecord) -> Result<()> {
        let key = self.key(url);
        let value = serde_json::to_string(record)?;
        self.store.save(&key, value)
    }

    /// Removes the entry for `url`.
    pub fn remove(&self, url: &str) -> Result<()> {
        self.store.delete(&self.key(url))
    }

    /// Removes every entry in this cache's namespace.
    ///
    /// Returns how many entries were removed.
    pub fn clear(&self) -> Result<usize> {
        let keys = self.namespaced_keys()?;
        for key in &keys {
            self.store.delete(key)?;
        }
        Ok(keys.len())
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> Result<usize> {
        Ok(self.namespaced_keys()?.len())
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> Result<CacheStats> {
        let now = self.now();
        let keys = self.namespaced_keys()?;
        let mut valid = 0;

        for key in &keys {
            let fresh = self
                .store
                .load(key)?
                .and_then(|raw| serde_json::from_str::<MetadataRecord>(&raw).ok())
                .is_some_and(|r| r.is_fresh_at(now));
            if fresh {
                valid += 1;
            }
        }

        Ok(CacheStats {
            total_entries: keys.len(),
            valid_entries: valid,
            expired_entries: keys.len() - valid,
        })
    }

    fn key(&self, url: &str) -> String {
        format!("{}{}", self.config.namespace, normalize_url(url))
    }

    fn namespaced_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.config.namespace))
            .collect())
    }
}

impl Default for MetaCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Total entries (including expired)
    pub total_entries: usize,
    /// Expired or unreadable entries
    pub expired_entries: usize,
    /// Fresh entries
    pub valid_entries: usize,
}

/// Canonical form of a URL used as a cache key.
///
/// Absolute URLs go through `url::Url`, which lowercases scheme and host and
/// adds the root path; anything else is only trimmed.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

use super::disk_tier::{DiskLookup, DiskTier};
use super::entry::EntryMetadata;
use super::memory_tier::{MemoryLookup, MemoryTier};
use super::sweeper::Sweeper;
use crate::config::CacheConfig;
use crate::errors::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub memory_entries: usize,
    pub memory_bytes: u64,
    pub disk_entries: usize,
    pub disk_bytes: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.memory_hits + self.disk_hits
    }

    pub fn lookups(&self) -> u64 {
        self.hits() + self.misses
    }

    /// Hits over lookups; 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits() as f64 / n as f64,
        }
    }
}

struct CacheInner {
    memory: MemoryTier,
    disk: DiskTier,
    default_ttl: Duration,
    memory_item_threshold: u64,
    counters: Counters,
}

impl CacheInner {
    fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let from_memory = self.memory.purge_expired(now);
        let from_disk = self.disk.purge_expired(now).unwrap_or_else(|e| {
            log::warn!("Cache sweep failed: {}", e);
            0
        });
        let purged = from_memory + from_disk;
        if purged > 0 {
            self.counters
                .expirations
                .fetch_add(purged as u64, Ordering::Relaxed);
            log::debug!("Cache sweep removed {} expired entries", purged);
        }
        purged
    }
}

/// Two-tier cache: a bounded in-memory LRU in front of a persistent store.
///
/// Reads check memory, then disk, promoting disk hits. Writes always reach
/// disk and also go to memory when small enough. TTLs are checked lazily on
/// access and by a background sweeper that stops when the cache is dropped.
pub struct LayeredCache {
    inner: Arc<CacheInner>,
    _sweeper: Option<Sweeper>,
}

impl LayeredCache {
    pub fn open(config: &CacheConfig) -> Result<Self> {
        let root = config.resolved_directory();
        let disk = DiskTier::open(&root, config.max_disk_bytes)?;
        let inner = Arc::new(CacheInner {
            memory: MemoryTier::new(config.max_memory_entries, config.max_memory_bytes),
            disk,
            default_ttl: config.default_ttl(),
            memory_item_threshold: config.memory_item_threshold,
            counters: Counters::default(),
        });

        let sweeper = if config.sweep_interval_secs > 0 {
            let for_sweeper = Arc::clone(&inner);
            let sweeper = Sweeper::spawn(config.sweep_interval(), move || {
                for_sweeper.purge_expired();
            })
            .map_err(|e| Error::Cache(format!("failed to start cache sweeper: {}", e)))?;
            Some(sweeper)
        } else {
            None
        };

        log::debug!("Opened cache at {}", root.display());
        Ok(Self {
            inner,
            _sweeper: sweeper,
        })
    }

    pub fn directory(&self) -> &Path {
        self.inner.disk.root()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = SystemTime::now();
        let counters = &self.inner.counters;

        match self.inner.memory.get(key, now) {
            MemoryLookup::Hit(value) => {
                counters.memory_hits.fetch_add(1, Ordering::Relaxed);
                return Some(value.to_vec());
            }
            MemoryLookup::Expired => {
                counters.expirations.fetch_add(1, Ordering::Relaxed);
            }
            MemoryLookup::Miss => {}
        }

        match self.inner.disk.get(key, now) {
            Ok(DiskLookup::Hit(bytes, meta)) => {
                counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                if meta.size_bytes <= self.inner.memory_item_threshold {
                    let evicted = self.inner.memory.insert(key, Arc::from(bytes.as_slice()), meta);
                    counters.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
                }
                Some(bytes)
            }
            Ok(DiskLookup::Expired) => {
                counters.expirations.fetch_add(1, Ordering::Relaxed);
                counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Ok(DiskLookup::Miss) => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                log::warn!("Cache read for {} failed: {}", key, e);
                counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value`; `ttl` of `None` uses the configured default
    pub fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>, tags: &[String]) -> Result<()> {
        let meta = EntryMetadata::new(
            value.len() as u64,
            ttl.unwrap_or(self.inner.default_ttl),
            tags,
        );

        let mut evicted = self.inner.disk.set(key, value, meta.clone())?;
        if meta.size_bytes <= self.inner.memory_item_threshold {
            evicted += self.inner.memory.insert(key, Arc::from(value), meta);
        } else {
            self.inner.memory.remove(key);
        }
        self.inner
            .counters
            .evictions
            .fetch_add(evicted as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn delete(&self, key: &str) -> bool {
        let in_memory = self.inner.memory.remove(key);
        let on_disk = self.inner.disk.delete(key).unwrap_or_else(|e| {
            log::warn!("Cache delete for {} failed: {}", key, e);
            false
        });
        in_memory || on_disk
    }

    /// Remove entries carrying any of `tags`, or everything for `None`.
    /// Returns the number of distinct keys removed.
    pub fn clear(&self, tags: Option<&[String]>) -> usize {
        let mut removed: BTreeSet<String> = self.inner.memory.clear(tags).into_iter().collect();
        match self.inner.disk.clear(tags) {
            Ok(keys) => removed.extend(keys),
            Err(e) => log::warn!("Cache clear failed: {}", e),
        }
        removed.len()
    }

    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Typed read; undecodable entries are dropped and read as misses
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Discarding undecodable cache entry {}: {}", key, e);
                self.delete(key);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        tags: &[String],
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes, ttl, tags)
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            disk_hits: c.disk_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            expirations: c.expirations.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            memory_entries: self.inner.memory.len(),
            memory_bytes: self.inner.memory.total_bytes(),
            disk_entries: self.inner.disk.len(),
            disk_bytes: self.inner.disk.total_bytes(),
        }
    }
}

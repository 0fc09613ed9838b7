//! In-process LRU tier bounded by entry count and total bytes.

use super::entry::EntryMetadata;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

struct MemoryEntry {
    value: Arc<[u8]>,
    meta: EntryMetadata,
    tick: u64,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, MemoryEntry>,
    total_bytes: u64,
    tick: u64,
}

impl MemoryState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &str) -> Option<MemoryEntry> {
        let entry = self.entries.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(entry.meta.size_bytes);
        Some(entry)
    }

    fn least_recently_used(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, e)| e.tick)
            .map(|(k, _)| k.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryLookup {
    Hit(Arc<[u8]>),
    /// Present but past its TTL; removed on the way out
    Expired,
    Miss,
}

pub struct MemoryTier {
    state: Mutex<MemoryState>,
    max_entries: usize,
    max_bytes: u64,
}

impl MemoryTier {
    pub fn new(max_entries: usize, max_bytes: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            max_entries,
            max_bytes,
        }
    }

    pub fn get(&self, key: &str, now: SystemTime) -> MemoryLookup {
        let mut state = self.state.lock();
        let expired = match state.entries.get(key) {
            None => return MemoryLookup::Miss,
            Some(entry) => entry.meta.is_expired(now),
        };
        if expired {
            state.remove(key);
            return MemoryLookup::Expired;
        }
        let tick = state.next_tick();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.tick = tick;
                entry.meta.touch(now);
                MemoryLookup::Hit(Arc::clone(&entry.value))
            }
            None => MemoryLookup::Miss,
        }
    }

    /// Insert or replace, then evict least-recently-used entries until both
    /// limits hold. Returns how many entries were evicted.
    pub fn insert(&self, key: &str, value: Arc<[u8]>, meta: EntryMetadata) -> usize {
        if meta.size_bytes > self.max_bytes || self.max_entries == 0 {
            self.remove(key);
            return 0;
        }

        let mut state = self.state.lock();
        state.remove(key);
        let tick = state.next_tick();
        state.total_bytes += meta.size_bytes;
        state
            .entries
            .insert(key.to_string(), MemoryEntry { value, meta, tick });

        let mut evicted = 0;
        while state.entries.len() > self.max_entries || state.total_bytes > self.max_bytes {
            let Some(victim) = state.least_recently_used() else {
                break;
            };
            state.remove(&victim);
            evicted += 1;
        }
        evicted
    }

    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key).is_some()
    }

    /// Remove entries matching `tags` (all entries for `None`); returns the
    /// removed keys
    pub fn clear(&self, tags: Option<&[String]>) -> Vec<String> {
        let mut state = self.state.lock();
        let keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| e.meta.matches_tags(tags))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            state.remove(key);
        }
        keys
    }

    pub fn purge_expired(&self, now: SystemTime) -> usize {
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| e.meta.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.state.lock().total_bytes
    }
}

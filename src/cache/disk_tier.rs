//! Persistent tier: one file per entry plus a JSON index.
//!
//! Layout under the cache root:
//!
//! ```text
//! index.json              key -> EntryMetadata
//! entries/<sha256>.entry  raw value bytes
//! ```
//!
//! The index lock only guards the in-memory map and is never held while
//! reading or writing files. Index writes are serialized by a separate lock
//! so a stale snapshot can never overwrite a newer one.

use super::atomic_io::{remove_if_exists, write_file_atomically};
use super::entry::EntryMetadata;
use super::key::content_hash;
use crate::errors::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const INDEX_FILE: &str = "index.json";
const ENTRIES_DIR: &str = "entries";
const ENTRY_EXTENSION: &str = "entry";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DiskIndex {
    entries: HashMap<String, EntryMetadata>,
    total_bytes: u64,
}

impl DiskIndex {
    fn recalculate_total(&mut self) {
        self.total_bytes = self.entries.values().map(|m| m.size_bytes).sum();
    }

    fn remove(&mut self, key: &str) -> Option<EntryMetadata> {
        let meta = self.entries.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(meta.size_bytes);
        Some(meta)
    }

    /// Keys to evict, oldest access first, until `max_bytes` holds.
    /// `keep` is never chosen.
    fn lru_victims(&self, max_bytes: u64, keep: &str) -> Vec<String> {
        if self.total_bytes <= max_bytes {
            return Vec::new();
        }
        let mut candidates: Vec<(&String, &EntryMetadata)> = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != keep)
            .collect();
        candidates.sort_by(|a, b| {
            a.1.last_accessed
                .cmp(&b.1.last_accessed)
                .then_with(|| a.1.created_at.cmp(&b.1.created_at))
                .then_with(|| a.0.cmp(b.0))
        });

        let mut total = self.total_bytes;
        let mut victims = Vec::new();
        for (key, meta) in candidates {
            if total <= max_bytes {
                break;
            }
            total = total.saturating_sub(meta.size_bytes);
            victims.push(key.clone());
        }
        victims
    }
}

#[derive(Debug)]
pub enum DiskLookup {
    Hit(Vec<u8>, EntryMetadata),
    Expired,
    Miss,
}

pub struct DiskTier {
    root: PathBuf,
    index: Mutex<DiskIndex>,
    save_lock: Mutex<()>,
    max_bytes: u64,
}

impl DiskTier {
    /// Open or create the tier at `root`. A corrupt index is replaced with
    /// an empty one; entry files it no longer references are removed.
    pub fn open(root: &Path, max_bytes: u64) -> Result<Self> {
        fs::create_dir_all(root.join(ENTRIES_DIR)).map_err(|e| {
            Error::Cache(format!(
                "failed to create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let index = Self::load_index(&root.join(INDEX_FILE));
        let tier = Self {
            root: root.to_path_buf(),
            index: Mutex::new(index),
            save_lock: Mutex::new(()),
            max_bytes,
        };
        tier.reconcile_with_files();
        Ok(tier)
    }

    fn load_index(path: &Path) -> DiskIndex {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to read cache index {}: {}", path.display(), e);
                }
                return DiskIndex::default();
            }
        };
        match serde_json::from_str::<DiskIndex>(&contents) {
            Ok(mut index) => {
                index.recalculate_total();
                index
            }
            Err(e) => {
                log::warn!("Cache index corrupted ({}), starting a new index", e);
                DiskIndex::default()
            }
        }
    }

    /// Drop index entries without a file and files without an index entry
    fn reconcile_with_files(&self) {
        let entries_dir = self.root.join(ENTRIES_DIR);
        let on_disk: HashSet<String> = match fs::read_dir(&entries_dir) {
            Ok(read_dir) => read_dir
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(e) => {
                log::warn!("Failed to list {}: {}", entries_dir.display(), e);
                return;
            }
        };

        let (dangling, referenced): (Vec<String>, HashSet<String>) = {
            let index = self.index.lock();
            let referenced: HashSet<String> =
                index.entries.keys().map(|k| Self::file_name_for(k)).collect();
            let dangling = index
                .entries
                .keys()
                .filter(|k| !on_disk.contains(&Self::file_name_for(k)))
                .cloned()
                .collect();
            (dangling, referenced)
        };

        for orphan in on_disk.difference(&referenced) {
            if let Err(e) = remove_if_exists(&entries_dir.join(orphan)) {
                log::debug!("Failed to remove orphaned cache file {}: {}", orphan, e);
            }
        }
        if !dangling.is_empty() {
            let mut index = self.index.lock();
            for key in &dangling {
                index.remove(key);
            }
        }
        if let Err(e) = self.save_index() {
            log::warn!("Failed to save cache index: {}", e);
        }
    }

    fn file_name_for(key: &str) -> String {
        format!("{}.{}", content_hash(key.as_bytes()), ENTRY_EXTENSION)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(ENTRIES_DIR).join(Self::file_name_for(key))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_index(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        let snapshot = self.index.lock().clone();
        let json = serde_json::to_vec(&snapshot)?;
        write_file_atomically(&self.root.join(INDEX_FILE), &json)
            .map_err(|e| Error::Cache(format!("failed to write cache index: {}", e)))
    }

    fn delete_files(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = remove_if_exists(&self.entry_path(key)) {
                log::debug!("Failed to remove cache entry file for {}: {}", key, e);
            }
        }
    }

    /// Expired, missing and corrupt entries are removed and reported as
    /// misses. Access metadata is updated in memory and persisted with the
    /// next index write.
    pub fn get(&self, key: &str, now: SystemTime) -> Result<DiskLookup> {
        let meta = {
            let mut index = self.index.lock();
            match index.entries.get(key) {
                None => return Ok(DiskLookup::Miss),
                Some(meta) if meta.is_expired(now) => {
                    index.remove(key);
                    None
                }
                Some(meta) => Some(meta.clone()),
            }
        };

        let Some(meta) = meta else {
            self.delete_files(&[key.to_string()]);
            self.save_index()?;
            return Ok(DiskLookup::Expired);
        };

        let bytes = match fs::read(self.entry_path(key)) {
            Ok(bytes) if bytes.len() as u64 == meta.size_bytes => bytes,
            Ok(bytes) => {
                log::warn!(
                    "Cache entry {} has {} bytes, expected {}; discarding",
                    key,
                    bytes.len(),
                    meta.size_bytes
                );
                self.discard(key)?;
                return Ok(DiskLookup::Miss);
            }
            Err(e) => {
                log::warn!("Cache entry {} unreadable ({}); discarding", key, e);
                self.discard(key)?;
                return Ok(DiskLookup::Miss);
            }
        };

        let touched = {
            let mut index = self.index.lock();
            index.entries.get_mut(key).map(|m| {
                m.touch(now);
                m.clone()
            })
        };
        Ok(DiskLookup::Hit(bytes, touched.unwrap_or(meta)))
    }

    fn discard(&self, key: &str) -> Result<()> {
        self.index.lock().remove(key);
        self.delete_files(&[key.to_string()]);
        self.save_index()
    }

    /// Store `bytes` under `key`, evicting least-recently-used entries to
    /// stay within the byte budget. Returns how many entries were evicted.
    pub fn set(&self, key: &str, bytes: &[u8], meta: EntryMetadata) -> Result<usize> {
        if meta.size_bytes > self.max_bytes {
            return Err(Error::Cache(format!(
                "entry of {} bytes exceeds the disk budget of {} bytes",
                meta.size_bytes, self.max_bytes
            )));
        }

        write_file_atomically(&self.entry_path(key), bytes)
            .map_err(|e| Error::Cache(format!("failed to write cache entry: {}", e)))?;

        let victims = {
            let mut index = self.index.lock();
            index.remove(key);
            index.total_bytes += meta.size_bytes;
            index.entries.insert(key.to_string(), meta);
            let victims = index.lru_victims(self.max_bytes, key);
            for victim in &victims {
                index.remove(victim);
            }
            victims
        };

        self.delete_files(&victims);
        self.save_index()?;
        Ok(victims.len())
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.index.lock().remove(key).is_some();
        if removed {
            self.delete_files(&[key.to_string()]);
            self.save_index()?;
        }
        Ok(removed)
    }

    /// Remove entries matching `tags` (all for `None`); returns removed keys
    pub fn clear(&self, tags: Option<&[String]>) -> Result<Vec<String>> {
        let keys: Vec<String> = {
            let mut index = self.index.lock();
            let keys: Vec<String> = index
                .entries
                .iter()
                .filter(|(_, m)| m.matches_tags(tags))
                .map(|(k, _)| k.clone())
                .collect();
            for key in &keys {
                index.remove(key);
            }
            keys
        };
        self.delete_files(&keys);
        self.save_index()?;
        Ok(keys)
    }

    pub fn purge_expired(&self, now: SystemTime) -> Result<usize> {
        let expired: Vec<String> = {
            let mut index = self.index.lock();
            let expired: Vec<String> = index
                .entries
                .iter()
                .filter(|(_, m)| m.is_expired(now))
                .map(|(k, _)| k.clone())
                .collect();
            for key in &expired {
                index.remove(key);
            }
            expired
        };
        if !expired.is_empty() {
            self.delete_files(&expired);
            self.save_index()?;
        }
        Ok(expired.len())
    }

    pub fn len(&self) -> usize {
        self.index.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.index.lock().total_bytes
    }
}

impl Drop for DiskTier {
    fn drop(&mut self) {
        if let Err(e) = self.save_index() {
            log::debug!("Failed to persist cache index on shutdown: {}", e);
        }
    }
}

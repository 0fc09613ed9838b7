//! Layered cache sizing and location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_enabled() -> bool {
    true
}

fn default_max_memory_entries() -> usize {
    1000
}

fn default_max_memory_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_disk_bytes() -> u64 {
    1024 * 1024 * 1024
}

fn default_memory_item_threshold() -> u64 {
    1024 * 1024
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Root of the disk tier. Defaults to the platform cache directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_max_memory_entries")]
    pub max_memory_entries: usize,

    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: u64,

    #[serde(default = "default_max_disk_bytes")]
    pub max_disk_bytes: u64,

    /// Values larger than this skip the memory tier
    #[serde(default = "default_memory_item_threshold")]
    pub memory_item_threshold: u64,

    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: None,
            max_memory_entries: default_max_memory_entries(),
            max_memory_bytes: default_max_memory_bytes(),
            max_disk_bytes: default_max_disk_bytes(),
            memory_item_threshold: default_memory_item_threshold(),
            default_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// Cache rooted at an explicit directory, otherwise default sizing
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// Configured directory, or `<platform cache dir>/importscope`, or a
    /// directory under the system temp dir when no cache dir is known.
    pub fn resolved_directory(&self) -> PathBuf {
        if let Some(dir) = &self.directory {
            return dir.clone();
        }
        dirs::cache_dir()
            .map(|d| d.join("importscope"))
            .unwrap_or_else(|| std::env::temp_dir().join("importscope-cache"))
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_memory_entries, 1000);
        assert_eq!(config.max_memory_bytes, 100 * 1024 * 1024);
        assert_eq!(config.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_explicit_directory_wins() {
        let config = CacheConfig::in_directory("/tmp/somewhere");
        assert_eq!(config.resolved_directory(), PathBuf::from("/tmp/somewhere"));
    }
}

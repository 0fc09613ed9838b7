//! Worker pool sizing for strategy dispatch.

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// Configuration for concurrent strategy execution.
///
/// When enabled, the detection strategies for one script run concurrently
/// on a bounded rayon pool. Batch analysis still handles scripts one at a
/// time. When disabled the strategies run sequentially.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Upper bound on concurrent workers. `None` uses all available cores.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_workers: None,
        }
    }
}

impl ParallelConfig {
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            max_workers: Some(1),
        }
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            enabled: true,
            max_workers: Some(workers.max(1)),
        }
    }

    /// Number of workers to actually spawn; always at least one
    pub fn effective_workers(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_uses_one_worker() {
        assert_eq!(ParallelConfig::sequential().effective_workers(), 1);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = ParallelConfig {
            enabled: true,
            max_workers: Some(0),
        };
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_default_uses_available_cores() {
        assert!(ParallelConfig::default().effective_workers() >= 1);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ParallelConfig = toml::from_str("max_workers = 3").unwrap();
        assert!(config.enabled);
        assert_eq!(config.effective_workers(), 3);
    }
}

//! Configuration for analysis runs and the layered cache.
//!
//! Settings come from an optional `importscope.toml` (searched upwards from
//! the script directory), then `IMPORTSCOPE_*` environment variables, then
//! command-line flags.

mod analysis_config;
mod cache;
mod loader;
mod parallel;
mod scoring;
mod thresholds;

pub use analysis_config::{AnalysisConfig, NameFilterConfig};
pub use cache::CacheConfig;
pub use loader::{
    apply_env_overrides, directory_ancestors, load_config, load_config_from, parse_config,
    EnvironmentSnapshot, CONFIG_FILE_NAME,
};
pub use parallel::ParallelConfig;
pub use scoring::{ConfidenceWeights, ContextWeights, StrategyWeights, TextualWeights};
pub use thresholds::TierThresholds;

use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// Root of `importscope.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportscopeConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl ImportscopeConfig {
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()
    }
}

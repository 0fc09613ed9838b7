use super::parallel::ParallelConfig;
use super::scoring::ConfidenceWeights;
use super::thresholds::TierThresholds;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_execution_timeout_secs() -> u64 {
    30
}

fn default_strategy_timeout_secs() -> u64 {
    60
}

fn default_large_module_count() -> usize {
    50
}

fn default_min_name_length() -> usize {
    2
}

fn default_max_name_length() -> usize {
    100
}

/// Tuning for the textual name filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameFilterConfig {
    #[serde(default = "default_min_name_length")]
    pub min_length: usize,

    #[serde(default = "default_max_name_length")]
    pub max_length: usize,

    /// Words rejected in addition to the built-in deny list
    #[serde(default)]
    pub extra_denied: Vec<String>,

    /// Built-in deny-list words to let through
    #[serde(default)]
    pub allowed: Vec<String>,
}

impl Default for NameFilterConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_name_length(),
            max_length: default_max_name_length(),
            extra_denied: Vec::new(),
            allowed: Vec::new(),
        }
    }
}

/// Settings for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub use_syntax_tree: bool,

    #[serde(default = "default_true")]
    pub use_textual: bool,

    /// Running the script has side effects, so tracing is opt-in
    #[serde(default)]
    pub use_execution_trace: bool,

    #[serde(default = "default_true")]
    pub use_framework_matching: bool,

    /// Query the target interpreter for unresolvable modules
    #[serde(default = "default_true")]
    pub check_missing_modules: bool,

    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    /// Deadline for the static strategies, measured from each one's start
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,

    /// Interpreter used for tracing and probing; `python3` on PATH if unset
    #[serde(default)]
    pub interpreter: Option<PathBuf>,

    #[serde(default = "default_large_module_count")]
    pub large_module_count: usize,

    #[serde(default)]
    pub parallel: ParallelConfig,

    #[serde(default)]
    pub thresholds: TierThresholds,

    #[serde(default)]
    pub weights: ConfidenceWeights,

    #[serde(default)]
    pub name_filter: NameFilterConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_syntax_tree: true,
            use_textual: true,
            use_execution_trace: false,
            use_framework_matching: true,
            check_missing_modules: true,
            execution_timeout_secs: default_execution_timeout_secs(),
            strategy_timeout_secs: default_strategy_timeout_secs(),
            interpreter: None,
            large_module_count: default_large_module_count(),
            parallel: ParallelConfig::default(),
            thresholds: TierThresholds::default(),
            weights: ConfidenceWeights::default(),
            name_filter: NameFilterConfig::default(),
        }
    }
}

/// The subset of [`AnalysisConfig`] that changes analysis output.
/// Worker counts and dispatch deadlines are deliberately absent.
#[derive(Serialize)]
struct Fingerprint<'a> {
    use_syntax_tree: bool,
    use_textual: bool,
    use_execution_trace: bool,
    use_framework_matching: bool,
    check_missing_modules: bool,
    execution_timeout_secs: u64,
    interpreter: Option<&'a PathBuf>,
    large_module_count: usize,
    thresholds: &'a TierThresholds,
    weights: &'a ConfidenceWeights,
    name_filter: &'a NameFilterConfig,
}

impl AnalysisConfig {
    pub fn with_execution_trace(mut self, enabled: bool) -> Self {
        self.use_execution_trace = enabled;
        self
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    pub fn max_parallel_workers(&self) -> usize {
        self.parallel.effective_workers()
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.weights.validate()?;

        if self.execution_timeout_secs == 0 {
            return Err(Error::Configuration(
                "execution_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.strategy_timeout_secs == 0 {
            return Err(Error::Configuration(
                "strategy_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.name_filter.min_length == 0
            || self.name_filter.min_length > self.name_filter.max_length
        {
            return Err(Error::Configuration(format!(
                "name_filter lengths out of order: min {} max {}",
                self.name_filter.min_length, self.name_filter.max_length
            )));
        }
        Ok(())
    }

    /// Canonical JSON of the output-relevant settings, used in cache keys
    pub fn fingerprint(&self) -> String {
        let fingerprint = Fingerprint {
            use_syntax_tree: self.use_syntax_tree,
            use_textual: self.use_textual,
            use_execution_trace: self.use_execution_trace,
            use_framework_matching: self.use_framework_matching,
            check_missing_modules: self.check_missing_modules,
            execution_timeout_secs: self.execution_timeout_secs,
            interpreter: self.interpreter.as_ref(),
            large_module_count: self.large_module_count,
            thresholds: &self.thresholds,
            weights: &self.weights,
            name_filter: &self.name_filter,
        };
        serde_json::to_string(&fingerprint).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.use_execution_trace);
        assert_eq!(config.execution_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_fingerprint_ignores_worker_count() {
        let a = AnalysisConfig::default();
        let mut b = AnalysisConfig::default();
        b.parallel = ParallelConfig::with_workers(7);
        b.strategy_timeout_secs = 5;
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_strategy_toggles() {
        let a = AnalysisConfig::default();
        let b = AnalysisConfig::default().with_execution_trace(true);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AnalysisConfig {
            execution_timeout_secs: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_partial_toml() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            use_execution_trace = true
            [thresholds]
            essential = 0.7
            "#,
        )
        .unwrap();
        assert!(config.use_execution_trace);
        assert_eq!(config.thresholds.essential, 0.7);
        assert_eq!(config.thresholds.recommended, 0.3);
    }
}

use super::{FindingContext, StrategyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Confidence tier derived from the normalized score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Essential,
    Recommended,
    Optional,
    Risky,
}

impl ConfidenceTier {
    /// Essential and recommended modules drive hidden-import generation
    pub fn is_recommended_or_better(&self) -> bool {
        matches!(self, Self::Essential | Self::Recommended)
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Essential => "essential",
            Self::Recommended => "recommended",
            Self::Optional => "optional",
            Self::Risky => "risky",
        };
        f.write_str(label)
    }
}

/// Everything known about one top-level module after reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAssessment {
    pub name: String,
    pub score: f64,
    pub tier: ConfidenceTier,
    pub contexts: BTreeSet<FindingContext>,
    pub strategies: BTreeSet<StrategyId>,
    /// Resolves to a file or package next to the script
    #[serde(default)]
    pub local: bool,
    /// Not importable in the target interpreter
    #[serde(default)]
    pub missing: bool,
}

/// Module names per tier, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPartition {
    pub essential: Vec<String>,
    pub recommended: Vec<String>,
    pub optional: Vec<String>,
    pub risky: Vec<String>,
}

impl TierPartition {
    pub fn get(&self, tier: ConfidenceTier) -> &[String] {
        match tier {
            ConfidenceTier::Essential => &self.essential,
            ConfidenceTier::Recommended => &self.recommended,
            ConfidenceTier::Optional => &self.optional,
            ConfidenceTier::Risky => &self.risky,
        }
    }

    pub fn total(&self) -> usize {
        self.essential.len() + self.recommended.len() + self.optional.len() + self.risky.len()
    }
}

/// A data file or directory the packaged program needs at runtime
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataFile {
    pub source: PathBuf,
    pub destination: String,
}

/// Packaging directives derived from an analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingDirectives {
    pub hidden_imports: Vec<String>,
    pub collect_all: Vec<String>,
    pub data_files: Vec<DataFile>,
}

impl PackagingDirectives {
    /// Render as packaging-tool command-line arguments
    pub fn to_cli_args(&self) -> Vec<String> {
        let separator = if cfg!(windows) { ';' } else { ':' };
        let mut args = Vec::new();

        for module in &self.hidden_imports {
            args.push("--hidden-import".to_string());
            args.push(module.clone());
        }
        for package in &self.collect_all {
            args.push("--collect-all".to_string());
            args.push(package.clone());
        }
        for data in &self.data_files {
            args.push("--add-data".to_string());
            args.push(format!(
                "{}{}{}",
                data.source.display(),
                separator,
                data.destination
            ));
        }

        args
    }

    pub fn is_empty(&self) -> bool {
        self.hidden_imports.is_empty() && self.collect_all.is_empty() && self.data_files.is_empty()
    }
}

/// How a strategy ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum StrategyStatus {
    Succeeded,
    /// Ran, but part of its input was unusable (e.g. a syntax error)
    Degraded(String),
    Failed(String),
    TimedOut,
    Cancelled,
    Skipped,
}

impl StrategyStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed(_) | Self::TimedOut | Self::Cancelled | Self::Degraded(_)
        )
    }
}

/// Per-strategy execution metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: StrategyId,
    pub status: StrategyStatus,
    pub findings: usize,
    pub modules: BTreeSet<String>,
    pub elapsed_ms: u64,
}

/// Directory-independent part of an analysis: what the strategies found
/// and how it scored. Cached by content; the rest of an [`AnalysisResult`]
/// is derived from it against the script's current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub content_hash: String,
    /// Scored modules, with `local` and `missing` still unset
    pub modules: BTreeMap<String, ModuleAssessment>,
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub runtime_missing: Vec<String>,
    pub strategies: Vec<StrategyReport>,
    #[serde(default)]
    pub parse_error: Option<String>,
    pub elapsed_ms: u64,
}

impl Detection {
    /// Some strategy was cut short by cancellation
    pub fn is_interrupted(&self) -> bool {
        self.strategies
            .iter()
            .any(|r| r.status == StrategyStatus::Cancelled)
    }
}

/// Aggregate output of one analysis invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub script: PathBuf,
    pub content_hash: String,
    pub analyzed_at: DateTime<Utc>,
    pub modules: BTreeMap<String, ModuleAssessment>,
    pub tiers: TierPartition,
    pub frameworks: Vec<String>,
    pub directives: PackagingDirectives,
    pub missing_modules: Vec<String>,
    /// Imports that raised ImportError while the script was traced
    #[serde(default)]
    pub runtime_missing: Vec<String>,
    pub recommendations: Vec<String>,
    pub strategies: Vec<StrategyReport>,
    #[serde(default)]
    pub parse_error: Option<String>,
    #[serde(default)]
    pub cache_hit: bool,
    pub elapsed_ms: u64,
}

impl AnalysisResult {
    pub fn module_names(&self) -> BTreeSet<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn tier_of(&self, module: &str) -> Option<ConfidenceTier> {
        self.modules.get(module).map(|m| m.tier)
    }

    pub fn score_of(&self, module: &str) -> Option<f64> {
        self.modules.get(module).map(|m| m.score)
    }

    /// Modules that a given strategy contributed evidence for
    pub fn modules_from(&self, strategy: StrategyId) -> BTreeSet<&str> {
        self.strategies
            .iter()
            .filter(|r| r.strategy == strategy)
            .flat_map(|r| r.modules.iter().map(String::as_str))
            .collect()
    }

    pub fn report_for(&self, strategy: StrategyId) -> Option<&StrategyReport> {
        self.strategies.iter().find(|r| r.strategy == strategy)
    }

    pub fn failed_strategies(&self) -> Vec<StrategyId> {
        self.strategies
            .iter()
            .filter(|r| r.status.is_failure())
            .map(|r| r.strategy)
            .collect()
    }

    /// Copy marked as served from cache
    pub fn served_from_cache(mut self) -> Self {
        self.cache_hit = true;
        self
    }
}

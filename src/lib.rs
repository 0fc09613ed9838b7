//! Multi-strategy detection of the modules a Python program imports.
//!
//! Given an entry-point script, importscope combines syntax-tree scanning,
//! textual pattern matching, optional sandboxed execution tracing and
//! framework knowledge into per-module confidence tiers, then derives
//! hidden-import, collect-all and data-file arguments for packaging tools.
//!
//! ```ignore
//! use importscope::{AnalysisConfig, DependencyAnalyzer};
//!
//! let analyzer = DependencyAnalyzer::new(AnalysisConfig::default())?;
//! let result = analyzer.analyze("app.py".as_ref())?;
//! println!("{}", result.directives.to_cli_args().join(" "));
//! ```

pub mod analyzer;
pub mod analyzers;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod frameworks;
pub mod interpreter;
pub mod observability;
pub mod progress;
pub mod reconciler;
pub mod report;

pub use crate::analyzer::DependencyAnalyzer;
pub use crate::analyzers::{CancellationToken, DetectionStrategy, SourceInput, StrategyOutput};
pub use crate::cache::{CacheKey, CacheStats, LayeredCache};
pub use crate::config::{AnalysisConfig, CacheConfig, ImportscopeConfig};
pub use crate::core::{
    AnalysisResult, ConfidenceTier, Detection, Finding, FindingContext, ModuleRef, PackagingDirectives,
    StrategyId, StrategyStatus,
};
pub use crate::errors::{Error, Result};
pub use crate::frameworks::{ConflictMatch, FrameworkKnowledgeBase, FrameworkProfile, KnownConflict};
pub use crate::interpreter::{discover_environments, EnvironmentKind, PythonEnvironment};
pub use crate::reconciler::Reconciler;

//! Core data model shared by every strategy, the reconciler and the cache.

pub mod finding;
pub mod module_ref;
pub mod result;

pub use finding::{
    modules_of, Finding, FindingContext, FindingSet, StrategyId, TextualPattern,
};
pub use module_ref::ModuleRef;
pub use result::{
    AnalysisResult, ConfidenceTier, DataFile, Detection, ModuleAssessment, PackagingDirectives,
    StrategyReport, StrategyStatus, TierPartition,
};

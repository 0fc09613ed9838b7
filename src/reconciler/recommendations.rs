//! Human-readable advice attached to an analysis result.

use crate::cache::CacheStats;
use crate::core::{StrategyReport, StrategyStatus};
use crate::frameworks::{ConflictMatch, FrameworkKnowledgeBase, FrameworkProfile};
use std::time::Duration;

/// Essential-module count below which execution tracing is suggested
pub const FEW_ESSENTIAL_MODULES: usize = 5;
/// Lookups required before the cache hit rate is worth reporting
pub const MIN_CACHE_LOOKUPS: u64 = 4;
pub const LOW_CACHE_HIT_RATE: f64 = 0.5;
pub const SLOW_ANALYSIS: Duration = Duration::from_secs(30);

const MAX_LISTED: usize = 5;

/// Everything the recommendation rules look at
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInputs<'a> {
    pub missing_modules: &'a [String],
    pub runtime_missing: &'a [String],
    pub module_count: usize,
    pub large_module_count: usize,
    pub essential_count: usize,
    pub execution_trace_enabled: bool,
    pub reports: &'a [StrategyReport],
    pub frameworks: &'a [&'static FrameworkProfile],
    pub conflicts: &'a [ConflictMatch],
    pub probe_error: Option<&'a str>,
}

pub fn recommend(inputs: &RecommendationInputs<'_>) -> Vec<String> {
    let mut out = Vec::new();

    if !inputs.missing_modules.is_empty() {
        out.push(format!(
            "{} module(s) not found in the target interpreter; install with: pip install {}",
            inputs.missing_modules.len(),
            install_names(inputs.missing_modules).join(" ")
        ));
        if inputs.missing_modules.len() > MAX_LISTED {
            out.push(format!(
                "{} more missing module(s) not listed",
                inputs.missing_modules.len() - MAX_LISTED
            ));
        }
    }

    if let Some(error) = inputs.probe_error {
        out.push(format!(
            "Could not query the target interpreter ({}); missing-module detection was skipped",
            error
        ));
    }

    if inputs.module_count > inputs.large_module_count {
        out.push(format!(
            "{} modules detected; check for unnecessary dependencies or use a virtual environment",
            inputs.module_count
        ));
    }

    for report in inputs.reports {
        if let Some(reason) = failure_reason(&report.status) {
            out.push(format!(
                "Strategy {} contributed no evidence: {}",
                report.strategy, reason
            ));
        }
    }

    if inputs.essential_count < FEW_ESSENTIAL_MODULES
        && !inputs.execution_trace_enabled
        && inputs.module_count > 0
    {
        out.push(
            "Few essential modules detected; enable execution tracing to catch imports made at runtime"
                .to_string(),
        );
    }

    if !inputs.runtime_missing.is_empty() {
        out.push(format!(
            "Imports failed while the script ran: {}",
            inputs.runtime_missing.join(", ")
        ));
    }

    for conflict in inputs.conflicts {
        out.push(format!(
            "Modules {} conflict: {}",
            conflict.modules.join(", "),
            conflict.reason
        ));
    }

    for framework in inputs.frameworks {
        out.extend(framework.notes.iter().map(|n| n.to_string()));
    }

    out
}

/// Advice about cache effectiveness, if there is any to give
pub fn cache_recommendation(stats: &CacheStats) -> Option<String> {
    (stats.lookups() >= MIN_CACHE_LOOKUPS && stats.hit_rate() < LOW_CACHE_HIT_RATE).then(|| {
        format!(
            "Cache hit rate is {:.0}%; scripts or settings change between runs, consider clearing the cache",
            stats.hit_rate() * 100.0
        )
    })
}

pub fn slow_analysis_recommendation(elapsed: Duration) -> Option<String> {
    (elapsed > SLOW_ANALYSIS).then(|| {
        format!(
            "Analysis took {:.1}s; consider disabling execution tracing or narrowing the script",
            elapsed.as_secs_f64()
        )
    })
}

fn failure_reason(status: &StrategyStatus) -> Option<String> {
    match status {
        StrategyStatus::Failed(reason) | StrategyStatus::Degraded(reason) => Some(reason.clone()),
        StrategyStatus::TimedOut => Some("timed out".to_string()),
        StrategyStatus::Cancelled => Some("cancelled".to_string()),
        StrategyStatus::Succeeded | StrategyStatus::Skipped => None,
    }
}

/// Distribution names for the first few missing modules
fn install_names(missing: &[String]) -> Vec<&str> {
    let kb = FrameworkKnowledgeBase::builtin();
    missing
        .iter()
        .take(MAX_LISTED)
        .map(|m| kb.package_for_module(m).unwrap_or(m.as_str()))
        .collect()
}

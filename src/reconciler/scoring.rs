//! Confidence scoring over a finding set.
//!
//! Each finding contributes `strategy_weight * context_weight` to the raw
//! score of its top-level module. Raw scores are normalized by the largest
//! one in the batch and mapped onto tiers.

use crate::config::{ConfidenceWeights, TierThresholds};
use crate::core::{
    Finding, FindingContext, FindingSet, ModuleAssessment, StrategyId, TierPartition,
};
use std::collections::{BTreeMap, BTreeSet};

/// Raw evidence gathered for one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleEvidence {
    pub raw: f64,
    pub contexts: BTreeSet<FindingContext>,
    pub strategies: BTreeSet<StrategyId>,
}

/// Sum contributions per top-level module.
///
/// Findings are deduplicated and visited in canonical order first, so the
/// sums do not depend on the order strategies reported them in.
pub fn accumulate<I>(findings: I, weights: &ConfidenceWeights) -> BTreeMap<String, ModuleEvidence>
where
    I: IntoIterator<Item = Finding>,
{
    let canonical: FindingSet = findings.into_iter().collect();
    let mut evidence: BTreeMap<String, ModuleEvidence> = BTreeMap::new();
    for finding in &canonical {
        let entry = evidence
            .entry(finding.module.top_level().to_string())
            .or_default();
        entry.raw += weights.contribution(finding);
        entry.contexts.insert(finding.context);
        entry.strategies.insert(finding.strategy);
    }
    evidence
}

/// Normalize raw scores into `[0, 1]` and assign tiers
pub fn assess(
    evidence: BTreeMap<String, ModuleEvidence>,
    thresholds: &TierThresholds,
) -> BTreeMap<String, ModuleAssessment> {
    let max = evidence.values().map(|e| e.raw).fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return BTreeMap::new();
    }

    evidence
        .into_iter()
        .map(|(name, e)| {
            let score = (e.raw / max).clamp(0.0, 1.0);
            let assessment = ModuleAssessment {
                name: name.clone(),
                score,
                tier: thresholds.classify(score),
                contexts: e.contexts,
                strategies: e.strategies,
                local: false,
                missing: false,
            };
            (name, assessment)
        })
        .collect()
}

/// Accumulate, normalize and tier in one step
pub fn score_findings<I>(
    findings: I,
    weights: &ConfidenceWeights,
    thresholds: &TierThresholds,
) -> BTreeMap<String, ModuleAssessment>
where
    I: IntoIterator<Item = Finding>,
{
    assess(accumulate(findings, weights), thresholds)
}

/// Module names grouped by tier, each group sorted
pub fn partition(modules: &BTreeMap<String, ModuleAssessment>) -> TierPartition {
    use crate::core::ConfidenceTier::*;

    let mut tiers = TierPartition::default();
    // BTreeMap iteration keeps every group sorted
    for (name, assessment) in modules {
        let bucket = match assessment.tier {
            Essential => &mut tiers.essential,
            Recommended => &mut tiers.recommended,
            Optional => &mut tiers.optional,
            Risky => &mut tiers.risky,
        };
        bucket.push(name.clone());
    }
    tiers
}

mod common;

use common::{reconcile_source, static_config};
use importscope::analyzers::{CancellationToken, TextualMatcher};
use importscope::config::{ConfidenceWeights, TierThresholds};
use importscope::core::{Finding, FindingContext, ModuleRef, StrategyId, TextualPattern};
use importscope::reconciler::{accumulate, score_findings};
use proptest::prelude::*;
use std::collections::BTreeSet;

const MODULES: &[&str] = &["os", "yaml", "requests", "numpy.linalg", "PyQt5.QtCore", "pkg.sub"];

const PATTERNS: &[TextualPattern] = &[
    TextualPattern::ImportModuleCall,
    TextualPattern::DunderImportCall,
    TextualPattern::SpecLookup,
    TextualPattern::ExecString,
    TextualPattern::ReflectiveAccess,
    TextualPattern::PluginLoader,
    TextualPattern::ConfigMap,
];

fn finding() -> impl Strategy<Value = Finding> {
    let module = prop::sample::select(MODULES).prop_map(|m| ModuleRef::parse(m).unwrap());
    let context = prop::sample::select(FindingContext::ALL.to_vec());
    prop_oneof![
        (
            module.clone(),
            context.clone(),
            prop::sample::select(vec![
                StrategyId::SyntaxTree,
                StrategyId::ExecutionTrace,
                StrategyId::FrameworkMatching,
            ])
        )
            .prop_map(|(m, c, s)| Finding::new(m, c, s)),
        (module, prop::sample::select(PATTERNS)).prop_map(|(m, p)| Finding::textual(m, p)),
    ]
}

fn findings() -> impl Strategy<Value = Vec<Finding>> {
    prop::collection::vec(finding(), 0..40)
}

proptest! {
    #[test]
    fn prop_accumulate_ignores_report_order(
        (original, shuffled) in findings().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let weights = ConfidenceWeights::default();
        prop_assert_eq!(accumulate(original, &weights), accumulate(shuffled, &weights));
    }

    #[test]
    fn prop_more_evidence_never_lowers_raw_score(base in findings(), extra in finding()) {
        let weights = ConfidenceWeights::default();
        let module = extra.module.top_level().to_string();
        let before = accumulate(base.clone(), &weights)
            .get(&module)
            .map(|e| e.raw)
            .unwrap_or(0.0);
        let mut grown = base;
        grown.push(extra);
        let after = accumulate(grown, &weights)[&module].raw;
        prop_assert!(after >= before);
    }

    #[test]
    fn prop_scores_are_normalized_and_tiers_follow_scores(batch in findings()) {
        let assessed = score_findings(batch, &ConfidenceWeights::default(), &TierThresholds::default());
        if assessed.is_empty() {
            return Ok(());
        }
        let max = assessed.values().map(|a| a.score).fold(0.0_f64, f64::max);
        prop_assert!((max - 1.0).abs() < 1e-9);
        for a in assessed.values() {
            prop_assert!((0.0..=1.0).contains(&a.score));
            for b in assessed.values() {
                if a.score > b.score {
                    prop_assert!(a.tier <= b.tier, "{} outranked by {}", a.name, b.name);
                }
            }
        }
    }

    #[test]
    fn prop_reconcile_is_repeatable(picks in prop::collection::vec(prop::sample::select(MODULES), 1..6)) {
        let source: String = picks.iter().map(|m| format!("import {}\n", m)).collect();
        let first = reconcile_source(&source, static_config());
        let second = reconcile_source(&source, static_config());
        prop_assert_eq!(first.module_names(), second.module_names());
        prop_assert_eq!(&first.tiers, &second.tiers);
        prop_assert_eq!(&first.directives, &second.directives);
    }
}

#[test]
fn test_syntax_error_leaves_textual_evidence_intact() {
    let source = "import os\nimportlib.import_module('yaml')\ndef broken(:\n    pass\n";
    let result = reconcile_source(source, static_config());

    let syntax = result.report_for(StrategyId::SyntaxTree).unwrap();
    assert!(syntax.modules.is_empty());
    assert!(result.parse_error.is_some());

    let direct: BTreeSet<String> = TextualMatcher::default()
        .match_source(source, &CancellationToken::new())
        .unwrap()
        .iter()
        .map(|f| f.module.top_level().to_string())
        .collect();
    let textual = result.report_for(StrategyId::Textual).unwrap();
    assert_eq!(textual.modules, direct);
    assert!(result.module_names().contains("yaml"));
}

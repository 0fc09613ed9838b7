mod common;

use common::{reconcile_source, static_config};
use importscope::config::AnalysisConfig;
use importscope::core::{ConfidenceTier, ModuleRef, StrategyId, StrategyStatus};
use importscope::frameworks::FrameworkKnowledgeBase;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn modules(names: &[&str]) -> BTreeSet<ModuleRef> {
    names.iter().filter_map(|n| ModuleRef::parse(n)).collect()
}

#[test]
fn test_submodule_imports_identify_qt() {
    let kb = FrameworkKnowledgeBase::builtin();
    let found: Vec<&str> = kb
        .lookup(&modules(&["PyQt5.QtCore", "PyQt5.QtWidgets"]))
        .iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(found, vec!["PyQt5"]);
}

#[test]
fn test_indicator_differs_from_profile_name() {
    let kb = FrameworkKnowledgeBase::builtin();
    let found: Vec<&str> = kb
        .lookup(&modules(&["cv2"]))
        .iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(found, vec!["opencv"]);
    assert_eq!(kb.package_for_module("cv2"), Some("opencv-python"));
    assert_eq!(kb.package_for_module("not_a_framework"), None);
}

#[test]
fn test_get_by_name() {
    let kb = FrameworkKnowledgeBase::builtin();
    let flask = kb.get("flask").unwrap();
    assert!(flask.companions.contains(&"jinja2"));
    assert!(kb.get("Flask").is_none());
}

#[test]
fn test_profile_names_are_unique() {
    let kb = FrameworkKnowledgeBase::builtin();
    let names: BTreeSet<&str> = kb.profiles().iter().map(|p| p.name).collect();
    assert_eq!(names.len(), kb.profiles().len());
}

#[test]
fn test_qt_script_gets_framework_directives() {
    let result = reconcile_source(
        indoc! {"
            import sys
            from PyQt5.QtCore import Qt
            from PyQt5.QtWidgets import QApplication
        "},
        static_config(),
    );

    assert_eq!(result.frameworks, vec!["PyQt5".to_string()]);
    assert_eq!(result.tier_of("PyQt5"), Some(ConfidenceTier::Essential));
    for module in ["PyQt5.sip", "PyQt5.QtCore", "PyQt5.QtGui", "PyQt5.QtWidgets"] {
        assert!(
            result.directives.hidden_imports.iter().any(|h| h == module),
            "{module} missing from hidden imports"
        );
    }
    assert!(result.directives.collect_all.contains(&"PyQt5".to_string()));
    assert!(!result.directives.hidden_imports.contains(&"sys".to_string()));
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("--collect-all PyQt5")));
}

#[test]
fn test_framework_matching_can_be_disabled() {
    let config = AnalysisConfig {
        use_framework_matching: false,
        ..static_config()
    };
    let result = reconcile_source("import flask\n", config);

    assert!(result.frameworks.is_empty());
    assert!(result.tier_of("jinja2").is_none());
    assert_eq!(
        result.report_for(StrategyId::FrameworkMatching).map(|r| &r.status),
        Some(&StrategyStatus::Skipped)
    );
}

use importscope::analyzers::{
    CancellationToken, HeuristicNameFilter, ModuleNameFilter, TextualMatcher,
};
use importscope::config::NameFilterConfig;
use importscope::core::TextualPattern;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

fn names(matcher: &TextualMatcher, source: &str) -> BTreeSet<String> {
    matcher
        .match_source(source, &CancellationToken::new())
        .unwrap_or_default()
        .iter()
        .map(|f| f.module.top_level().to_string())
        .collect()
}

#[test]
fn test_plugin_registry_strings_are_found() {
    let source = indoc! {r#"
        BACKENDS = {
            "backend": "redis.client",
            "handler": "kombu.transport",
        }

        def load(name):
            return importlib.import_module("exporters.csv_exporter")
    "#};
    let found = names(&TextualMatcher::default(), source);
    assert!(found.contains("redis"));
    assert!(found.contains("kombu"));
    assert!(found.contains("exporters"));
}

#[test]
fn test_every_finding_names_its_pattern() {
    let findings = TextualMatcher::default()
        .match_source("__import__('zlib')\n", &CancellationToken::new())
        .unwrap();
    let patterns: Vec<Option<TextualPattern>> = findings.iter().map(|f| f.pattern).collect();
    assert_eq!(patterns, vec![Some(TextualPattern::DunderImportCall)]);
}

#[test]
fn test_filter_is_pluggable() {
    struct OnlyYaml;

    impl ModuleNameFilter for OnlyYaml {
        fn accept(&self, candidate: &str) -> bool {
            candidate == "yaml"
        }
    }

    let matcher = TextualMatcher::new(Arc::new(OnlyYaml));
    let found = names(
        &matcher,
        "importlib.import_module('yaml')\nimportlib.import_module('toml')\n",
    );
    assert_eq!(found, ["yaml".to_string()].into_iter().collect::<BTreeSet<_>>());
}

#[test]
fn test_configured_deny_and_allow_lists() {
    let filter = HeuristicNameFilter::from_config(&NameFilterConfig {
        extra_denied: vec!["internal".to_string()],
        allowed: vec!["plugin".to_string()],
        ..NameFilterConfig::default()
    });
    assert!(!filter.accept("internal"));
    assert!(filter.accept("plugin"));
    assert!(!filter.accept("config"));
    assert!(filter.accept("requests"));
}

#[test]
fn test_shape_rules() {
    let filter = HeuristicNameFilter::default();
    assert!(!filter.accept("a"));
    assert!(!filter.accept("1234"));
    assert!(!filter.accept("path/to/file"));
    assert!(!filter.accept("has space"));
    assert!(filter.accept("numpy"));
}

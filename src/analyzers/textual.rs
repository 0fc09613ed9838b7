//! Textual strategy: regex rules over the raw source.
//!
//! Catches module names that only appear inside strings, such as plugin
//! registries and config maps. Every capture must pass a
//! [`ModuleNameFilter`] before it becomes a finding.

use super::name_filter::{HeuristicNameFilter, ModuleNameFilter};
use super::{CancellationToken, DetectionStrategy, SourceInput, StrategyOutput};
use crate::core::{Finding, FindingSet, ModuleRef, StrategyId, StrategyStatus, TextualPattern};
use crate::observability::{set_phase, AnalysisPhase};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// One compiled rule; capture group 1 is the module name
#[derive(Debug)]
pub struct TextualRule {
    pub pattern: TextualPattern,
    pub regex: Regex,
}

impl TextualRule {
    fn compile(pattern: TextualPattern, source: &str) -> Option<Self> {
        match Regex::new(source) {
            Ok(regex) => Some(Self { pattern, regex }),
            Err(e) => {
                log::error!("Skipping textual rule {}: {}", pattern.as_str(), e);
                None
            }
        }
    }
}

static RULES: Lazy<Vec<TextualRule>> = Lazy::new(|| {
    [
        (
            TextualPattern::ImportModuleCall,
            r#"\b(?:importlib\s*\.\s*)?import_module\s*\(\s*['"]([^'"]+)['"]"#,
        ),
        (
            TextualPattern::DunderImportCall,
            r#"\b__import__\s*\(\s*['"]([^'"]+)['"]"#,
        ),
        (
            TextualPattern::SpecLookup,
            r#"\b(?:find_spec|spec_from_file_location)\s*\(\s*['"]([^'"]+)['"]"#,
        ),
        (
            TextualPattern::ExecString,
            r#"\b(?:exec|eval)\s*\(\s*[rRuU]?['"](?:[^'"]*?(?:;|\\n)\s*)?import\s+([A-Za-z_][A-Za-z0-9_.]*)"#,
        ),
        (
            TextualPattern::ExecString,
            r#"\b(?:exec|eval)\s*\(\s*[rRuU]?['"][^'"]*?\bfrom\s+([A-Za-z_][A-Za-z0-9_.]*)\s+import\b"#,
        ),
        (
            TextualPattern::ReflectiveAccess,
            r#"\b(?:hasattr|getattr)\s*\(\s*[A-Za-z_][A-Za-z0-9_.]*\s*,\s*['"]([^'"]+)['"]"#,
        ),
        (
            TextualPattern::PluginLoader,
            r#"\b(?:load_plugin|get_plugin|register_plugin)\s*\(\s*['"]([^'"]+)['"]"#,
        ),
        (
            TextualPattern::ConfigMap,
            r#"['"](?:module|plugin|handler|backend)['"]\s*:\s*['"]([^'"]+)['"]"#,
        ),
    ]
    .into_iter()
    .filter_map(|(pattern, source)| TextualRule::compile(pattern, source))
    .collect()
});

/// The rule table, in evaluation order
pub fn rules() -> &'static [TextualRule] {
    &RULES
}

#[derive(Clone)]
pub struct TextualMatcher {
    filter: Arc<dyn ModuleNameFilter>,
}

impl Default for TextualMatcher {
    fn default() -> Self {
        Self::new(Arc::new(HeuristicNameFilter::default()))
    }
}

impl TextualMatcher {
    pub fn new(filter: Arc<dyn ModuleNameFilter>) -> Self {
        Self { filter }
    }

    /// Apply every rule to `source`. Returns `None` when cancelled part way.
    pub fn match_source(&self, source: &str, cancel: &CancellationToken) -> Option<FindingSet> {
        let mut findings = FindingSet::new();
        for rule in rules() {
            if cancel.is_cancelled() {
                return None;
            }
            for captures in rule.regex.captures_iter(source) {
                let Some(candidate) = captures.get(1).map(|m| m.as_str().trim()) else {
                    continue;
                };
                if !self.filter.accept(candidate) {
                    continue;
                }
                if let Some(module) = ModuleRef::parse(candidate) {
                    findings.insert(Finding::textual(module, rule.pattern));
                }
            }
        }
        Some(findings)
    }
}

impl DetectionStrategy for TextualMatcher {
    fn id(&self) -> StrategyId {
        StrategyId::Textual
    }

    fn analyze(&self, input: &SourceInput, cancel: &CancellationToken) -> StrategyOutput {
        let _phase = set_phase(AnalysisPhase::TextualScan);
        match self.match_source(&input.source, cancel) {
            Some(findings) => {
                tracing::debug!(
                    script = %input.path.display(),
                    findings = findings.len(),
                    "textual scan complete"
                );
                StrategyOutput::succeeded(findings)
            }
            None => StrategyOutput::empty(StrategyStatus::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn matched(source: &str) -> Vec<(String, TextualPattern)> {
        TextualMatcher::default()
            .match_source(source, &CancellationToken::new())
            .unwrap()
            .into_iter()
            .map(|f| (f.module.top_level().to_string(), f.pattern.unwrap()))
            .collect()
    }

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(rules().len(), 8);
    }

    #[test]
    fn test_each_rule_family() {
        let found = matched(indoc! {r#"
            mod = importlib.import_module("lxml.etree")
            legacy = __import__('chardet')
            spec = importlib.util.find_spec("yaml")
            exec("import toml")
            eval("from dateutil import parser")
            if hasattr(backends, "redis"):
                pass
            load_plugin("acme_exporter")
            CONFIG = {"backend": "celery.backends.redis"}
        "#});
        let names: Vec<&str> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["acme_exporter", "celery", "chardet", "dateutil", "lxml", "redis", "toml", "yaml"]
        );
        assert!(found.contains(&("lxml".to_string(), TextualPattern::ImportModuleCall)));
        assert!(found.contains(&("celery".to_string(), TextualPattern::ConfigMap)));
        assert!(found.contains(&("redis".to_string(), TextualPattern::ReflectiveAccess)));
    }

    #[test]
    fn test_filter_drops_noise() {
        let found = matched(indoc! {r#"
            getattr(obj, "name")
            settings = {"module": "https://example.com/x"}
            load_plugin("main")
        "#});
        assert!(found.is_empty());
    }

    #[test]
    fn test_variable_targets_are_ignored() {
        assert!(matched("importlib.import_module(plugin_name)\n").is_empty());
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let input = SourceInput::from_source("x.py", "__import__('zlib')");
        let output = TextualMatcher::default().analyze(&input, &cancel);
        assert_eq!(output.status, StrategyStatus::Cancelled);
        assert!(output.findings.is_empty());
    }
}

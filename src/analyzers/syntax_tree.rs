//! Syntax-tree strategy.
//!
//! Parses the script with tree-sitter-python and reports every `import`,
//! `from ... import` and `from __future__ import` statement, classified by
//! the nearest enclosing construct, plus dynamic import calls whose target
//! is a plain string literal.

use super::{CancellationToken, DetectionStrategy, SourceInput, StrategyOutput};
use crate::core::{Finding, FindingContext, FindingSet, ModuleRef, StrategyId, StrategyStatus};
use crate::errors::{Error, Result};
use crate::observability::{set_phase, AnalysisPhase};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Callees whose first string argument names a module
const DYNAMIC_IMPORT_CALLEES: &[&str] = &[
    "__import__",
    "importlib.import_module",
    "import_module",
    "importlib.__import__",
];

fn parse_python(source: &str, path: &Path) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::Configuration(format!("Failed to load Python grammar: {}", e)))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(path, 1, 1, "parser returned no tree"))
}

fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// First ERROR or MISSING node in document order
fn first_error_node(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

/// Nearest classifying ancestor wins; loops and `with` blocks are transparent.
fn classify_context(node: Node<'_>) -> FindingContext {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "try_statement" | "except_clause" | "except_group_clause" | "finally_clause" => {
                return FindingContext::ExceptionHandler
            }
            "else_clause" => match ancestor.parent().map(|p| p.kind()) {
                Some("try_statement") => return FindingContext::ExceptionHandler,
                Some("if_statement") => return FindingContext::ConditionalBranch,
                _ => {}
            },
            "if_statement" | "elif_clause" | "conditional_expression" | "match_statement"
            | "case_clause" => return FindingContext::ConditionalBranch,
            "function_definition" | "lambda" => return FindingContext::FunctionBody,
            "class_definition" => return FindingContext::ClassBody,
            "module" => return FindingContext::TopLevelImport,
            _ => {}
        }
        current = ancestor.parent();
    }
    FindingContext::TopLevelImport
}

fn imported_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    match node.kind() {
        "dotted_name" => Some(node_text(node, source)),
        "aliased_import" => node
            .child_by_field_name("name")
            .map(|name| node_text(name, source)),
        _ => None,
    }
}

/// Contents of a plain string literal. f-strings, bytes, escapes and
/// implicit concatenation are not resolved.
fn plain_string_literal<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    if node.kind() != "string" {
        return None;
    }
    let mut content = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                let prefix = node_text(child, source);
                if prefix.chars().any(|c| matches!(c, 'f' | 'F' | 'b' | 'B')) {
                    return None;
                }
            }
            "string_content" => {
                if content.is_some() || child.named_child_count() > 0 {
                    return None;
                }
                content = Some(node_text(child, source));
            }
            "string_end" => {}
            _ => return None,
        }
    }
    content
}

fn literal_dynamic_import<'a>(call: Node<'_>, source: &'a str) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    let callee: String = node_text(function, source).split_whitespace().collect();
    if !DYNAMIC_IMPORT_CALLEES.contains(&callee.as_str()) {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let first = arguments
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    plain_string_literal(first, source)
}

fn push_module(findings: &mut FindingSet, name: &str, context: FindingContext) {
    if let Some(module) = ModuleRef::parse(name) {
        findings.insert(Finding::new(module, context, StrategyId::SyntaxTree));
    }
}

fn visit_node(node: Node<'_>, source: &str, findings: &mut FindingSet) {
    match node.kind() {
        "import_statement" => {
            let context = classify_context(node);
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                if let Some(module) = imported_name(name, source) {
                    push_module(findings, module, context);
                }
            }
        }
        "import_from_statement" => {
            // relative_import names a local module and produces nothing
            if let Some(module) = node.child_by_field_name("module_name") {
                if module.kind() == "dotted_name" {
                    push_module(findings, node_text(module, source), classify_context(node));
                }
            }
        }
        "future_import_statement" => {
            push_module(findings, "__future__", classify_context(node));
        }
        "call" => {
            if let Some(module) = literal_dynamic_import(node, source) {
                push_module(findings, module, FindingContext::DynamicCall);
            }
        }
        _ => {}
    }
}

/// Scan Python source. A syntax error anywhere yields [`Error::Parse`]
/// pointing at the first error node and no findings.
pub fn scan_source(source: &str, path: &Path) -> Result<FindingSet> {
    let tree = parse_python(source, path)?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, column, message) = match first_error_node(root) {
            Some(node) if node.is_missing() => (
                node.start_position().row + 1,
                node.start_position().column + 1,
                format!("missing {}", node.kind()),
            ),
            Some(node) => (
                node.start_position().row + 1,
                node.start_position().column + 1,
                "invalid syntax".to_string(),
            ),
            None => (1, 1, "invalid syntax".to_string()),
        };
        return Err(Error::parse(path, line, column, message));
    }

    let mut findings = FindingSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit_node(node, source, &mut findings);
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    Ok(findings)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxTreeScanner;

impl SyntaxTreeScanner {
    pub fn new() -> Self {
        Self
    }
}

impl DetectionStrategy for SyntaxTreeScanner {
    fn id(&self) -> StrategyId {
        StrategyId::SyntaxTree
    }

    fn analyze(&self, input: &SourceInput, cancel: &CancellationToken) -> StrategyOutput {
        let _phase = set_phase(AnalysisPhase::SyntaxScan);
        if cancel.is_cancelled() {
            return StrategyOutput::empty(StrategyStatus::Cancelled);
        }

        match scan_source(&input.source, &input.path) {
            Ok(findings) => {
                tracing::debug!(
                    script = %input.path.display(),
                    findings = findings.len(),
                    "syntax scan complete"
                );
                StrategyOutput::succeeded(findings)
            }
            Err(e @ Error::Parse { .. }) => {
                tracing::warn!("{}", e);
                StrategyOutput::empty(StrategyStatus::Degraded(e.to_string()))
            }
            Err(e) => StrategyOutput::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<(String, FindingContext)> {
        scan_source(source, Path::new("test.py"))
            .unwrap()
            .into_iter()
            .map(|f| (f.module.top_level().to_string(), f.context))
            .collect()
    }

    #[test]
    fn test_aliases_and_dotted_names() {
        let found = scan("import numpy as np, xml.etree.ElementTree as ET\n");
        assert_eq!(
            found,
            vec![
                ("numpy".to_string(), FindingContext::TopLevelImport),
                ("xml".to_string(), FindingContext::TopLevelImport),
            ]
        );
    }

    #[test]
    fn test_relative_imports_are_skipped() {
        let found = scan(indoc! {"
            from . import sibling
            from .pkg import thing
            from ..up import other
        "});
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_contexts() {
        let found = scan(indoc! {"
            class Loader:
                import json

                def load(self):
                    import yaml

            for _ in range(3):
                import csv

            with open('x') as fh:
                try:
                    import ujson
                except ImportError:
                    pass
        "});
        assert_eq!(
            found,
            vec![
                ("csv".to_string(), FindingContext::TopLevelImport),
                ("json".to_string(), FindingContext::ClassBody),
                ("ujson".to_string(), FindingContext::ExceptionHandler),
                ("yaml".to_string(), FindingContext::FunctionBody),
            ]
        );
    }

    #[test]
    fn test_else_clauses() {
        let found = scan(indoc! {"
            try:
                pass
            except Exception:
                pass
            else:
                import toml

            if flag:
                pass
            else:
                import tomllib
        "});
        assert_eq!(
            found,
            vec![
                ("toml".to_string(), FindingContext::ExceptionHandler),
                ("tomllib".to_string(), FindingContext::ConditionalBranch),
            ]
        );
    }

    #[test]
    fn test_dynamic_calls_need_plain_literals() {
        let found = scan(indoc! {r#"
            import importlib
            importlib.import_module("math")
            __import__('zlib')
            importlib.import_module(name)
            importlib.import_module(f"plug_{name}")
            importlib.import_module("a" + suffix)
            importlib.import_module(".relative", package="pkg")
        "#});
        assert_eq!(
            found,
            vec![
                ("importlib".to_string(), FindingContext::TopLevelImport),
                ("math".to_string(), FindingContext::DynamicCall),
                ("zlib".to_string(), FindingContext::DynamicCall),
            ]
        );
    }

    #[test]
    fn test_future_import() {
        let found = scan("from __future__ import annotations\n");
        assert_eq!(
            found,
            vec![("__future__".to_string(), FindingContext::TopLevelImport)]
        );
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let err = scan_source("import os\ndef broken(:\n    pass\n", Path::new("bad.py"))
            .unwrap_err();
        match err {
            Error::Parse { file, line, .. } => {
                assert_eq!(file, Path::new("bad.py"));
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_strategy_degrades_on_syntax_error() {
        let input = SourceInput::from_source("bad.py", "import os\nif x\n");
        let output = SyntaxTreeScanner.analyze(&input, &CancellationToken::new());
        assert!(output.findings.is_empty());
        assert!(matches!(output.status, StrategyStatus::Degraded(_)));
    }
}

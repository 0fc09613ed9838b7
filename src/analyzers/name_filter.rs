//! Plausibility filter for module names captured from free text.

use crate::config::NameFilterConfig;
use std::collections::HashSet;

/// Decides whether a captured string could name a Python module
pub trait ModuleNameFilter: Send + Sync {
    fn accept(&self, candidate: &str) -> bool;
}

/// Identifiers that show up in string literals far more often as keys,
/// values or variable names than as module names. `data` is a common
/// package name and stays allowed.
const DEFAULT_DENIED: &[&str] = &[
    "main", "name", "file", "path", "version", "true", "false", "none", "null", "self", "cls",
    "args", "kwargs", "value", "key", "item", "result", "config", "settings", "author",
    "description", "license", "url", "index", "count", "size", "length", "width", "height",
    "default", "auto", "debug", "info", "warning", "error", "success", "failure", "undefined",
    "empty", "get", "set", "add", "remove", "delete", "update", "create", "read", "write",
    "open", "close", "start", "stop", "run", "init", "load", "save", "module", "plugin",
    "handler", "backend",
];

#[derive(Debug, Clone)]
pub struct HeuristicNameFilter {
    min_length: usize,
    max_length: usize,
    denied: HashSet<String>,
}

impl Default for HeuristicNameFilter {
    fn default() -> Self {
        Self::from_config(&NameFilterConfig::default())
    }
}

impl HeuristicNameFilter {
    pub fn from_config(config: &NameFilterConfig) -> Self {
        let allowed: HashSet<String> = config.allowed.iter().map(|w| w.to_lowercase()).collect();
        let denied = DEFAULT_DENIED
            .iter()
            .map(|w| w.to_string())
            .chain(config.extra_denied.iter().map(|w| w.to_lowercase()))
            .filter(|w| !allowed.contains(w))
            .collect();
        Self {
            min_length: config.min_length,
            max_length: config.max_length,
            denied,
        }
    }

    pub fn is_denied(&self, candidate: &str) -> bool {
        self.denied.contains(&candidate.to_lowercase())
    }
}

fn looks_like_path_or_url(candidate: &str) -> bool {
    candidate.contains('/')
        || candidate.contains('\\')
        || candidate.contains("://")
        || candidate.starts_with("www.")
}

impl ModuleNameFilter for HeuristicNameFilter {
    fn accept(&self, candidate: &str) -> bool {
        let len = candidate.chars().count();
        if len < self.min_length || len > self.max_length {
            return false;
        }
        if looks_like_path_or_url(candidate) {
            return false;
        }
        if candidate.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return false;
        }
        if !candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return false;
        }
        match candidate.chars().next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return false,
        }
        if candidate.split('.').any(str::is_empty) {
            return false;
        }
        !self.is_denied(candidate)
    }
}

// Shared helpers for importscope integration tests
#![allow(dead_code)]

use importscope::analyzers::{CancellationToken, SourceInput};
use importscope::config::AnalysisConfig;
use importscope::core::AnalysisResult;
use importscope::interpreter::resolve_interpreter;
use importscope::reconciler::Reconciler;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `content` to `dir/name` and return the path
pub fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Static strategies only, no interpreter probing
pub fn static_config() -> AnalysisConfig {
    AnalysisConfig {
        check_missing_modules: false,
        ..AnalysisConfig::default()
    }
}

/// Reconcile an in-memory script located in a directory that does not exist
pub fn reconcile_source(source: &str, config: AnalysisConfig) -> AnalysisResult {
    let input = SourceInput::from_source("/nonexistent/importscope-test/app.py", source);
    Reconciler::new(config).reconcile(&input, &CancellationToken::new())
}

/// True when a Python interpreter is on PATH. Tests that need one print a
/// note and return early otherwise.
pub fn python_available() -> bool {
    match resolve_interpreter(None) {
        Ok(_) => true,
        Err(e) => {
            eprintln!("skipping: {}", e);
            false
        }
    }
}

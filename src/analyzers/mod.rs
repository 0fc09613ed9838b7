//! Detection strategies.
//!
//! Each strategy reads one script and reports the modules it references as
//! a [`FindingSet`]. Strategies never fail the analysis: problems are
//! reported through [`StrategyStatus`] and the findings gathered so far.

pub mod execution_trace;
pub mod name_filter;
pub mod syntax_tree;
pub mod textual;

pub use execution_trace::{ExecutionTracer, TraceOutcome, TraceStatus};
pub use name_filter::{HeuristicNameFilter, ModuleNameFilter};
pub use syntax_tree::{scan_source, SyntaxTreeScanner};
pub use textual::{TextualMatcher, TextualRule};

use crate::cache::content_hash;
use crate::core::{FindingSet, StrategyId, StrategyStatus};
use crate::errors::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A script loaded for analysis. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub path: PathBuf,
    pub source: Arc<str>,
    /// sha256 of the raw file bytes
    pub content_hash: String,
}

impl SourceInput {
    /// Read a script from disk. Undecodable bytes are replaced.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::input(path, "not a readable file"));
        }
        let bytes = std::fs::read(path).map_err(|e| Error::input_io(path, e))?;
        let content_hash = content_hash(&bytes);
        let source: Arc<str> = String::from_utf8_lossy(&bytes).into();
        Ok(Self {
            path: path.to_path_buf(),
            source,
            content_hash,
        })
    }

    /// In-memory source; the path is used for diagnostics and tracing
    pub fn from_source(path: impl Into<PathBuf>, source: &str) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash(source.as_bytes()),
            source: source.into(),
        }
    }

    /// Directory the script lives in, `.` for bare file names
    pub fn script_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Shared cancellation flag checked by long-running strategies
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What one strategy produced for one script
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub findings: FindingSet,
    pub status: StrategyStatus,
    /// Imports that failed while the script ran
    pub runtime_missing: BTreeSet<String>,
}

impl StrategyOutput {
    pub fn succeeded(findings: FindingSet) -> Self {
        Self {
            findings,
            status: StrategyStatus::Succeeded,
            runtime_missing: BTreeSet::new(),
        }
    }

    pub fn empty(status: StrategyStatus) -> Self {
        Self {
            findings: FindingSet::new(),
            status,
            runtime_missing: BTreeSet::new(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::empty(StrategyStatus::Failed(reason.into()))
    }
}

/// A module detection strategy run against one script
pub trait DetectionStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    fn analyze(&self, input: &SourceInput, cancel: &CancellationToken) -> StrategyOutput;

    /// Overrides the dispatcher's default per-strategy deadline
    fn deadline(&self) -> Option<Duration> {
        None
    }
}

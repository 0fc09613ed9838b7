//! Thread-local context tracking.
//!
//! Records which phase of an analysis the current thread is in and which
//! script it is working on. Each rayon worker keeps its own context; guards
//! restore the previous context on drop so phases nest.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisContext {
    pub phase: Option<AnalysisPhase>,
    pub current_script: Option<PathBuf>,
}

impl AnalysisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_script: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    /// Reading the script and computing its content hash
    Reading,
    SyntaxScan,
    TextualScan,
    ExecutionTrace,
    Reconciling,
    FrameworkMatching,
    /// Probing the target interpreter
    Probing,
    Caching,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "reading"),
            Self::SyntaxScan => write!(f, "syntax_scan"),
            Self::TextualScan => write!(f, "textual_scan"),
            Self::ExecutionTrace => write!(f, "execution_trace"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::FrameworkMatching => write!(f, "framework_matching"),
            Self::Probing => write!(f, "probing"),
            Self::Caching => write!(f, "caching"),
        }
    }
}

/// Restores the previous context when dropped
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().phase = Some(phase);
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_current_script(path: &Path) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().current_script = Some(path.to_path_buf());
        ContextGuard { previous }
    })
}

pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Short description for log lines, e.g. `syntax_scan in app.py`
pub fn describe_current() -> String {
    let context = get_current_context();
    match (context.phase, context.current_script) {
        (Some(phase), Some(script)) => format!("{} in {}", phase, script.display()),
        (Some(phase), None) => phase.to_string(),
        (None, Some(script)) => script.display().to_string(),
        (None, None) => "idle".to_string(),
    }
}

//! Logging setup and per-thread analysis context.
//!
//! ```ignore
//! use importscope::observability::{init_logging, set_phase, AnalysisPhase};
//!
//! init_logging(0);
//! let _phase = set_phase(AnalysisPhase::SyntaxScan);
//! ```

pub mod context;
pub mod logging;

pub use context::{
    describe_current, get_current_context, set_current_script, set_phase, AnalysisContext,
    AnalysisPhase, ContextGuard,
};
pub use logging::init_logging;

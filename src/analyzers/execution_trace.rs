//! Execution-trace strategy.
//!
//! Runs the script in a child interpreter whose import machinery is patched
//! to report every absolute import on stderr. The child runs in the script's
//! directory with no stdin and is killed at the deadline or on cancellation.
//! A timed-out or cancelled trace contributes no findings.

use super::{CancellationToken, DetectionStrategy, SourceInput, StrategyOutput};
use crate::core::{Finding, FindingContext, FindingSet, ModuleRef, StrategyId, StrategyStatus};
use crate::interpreter::{kill_and_reap, resolve_interpreter};
use crate::observability::{set_phase, AnalysisPhase};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const TRACE_TAG: &str = "__IMPORTSCOPE_TRACE__:";
const MISSING_TAG: &str = "__IMPORTSCOPE_MISSING__:";
const ERROR_TAG: &str = "__IMPORTSCOPE_ERROR__:";

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DRAIN_GRACE: Duration = Duration::from_secs(1);
/// Slack the dispatcher grants on top of the trace timeout
const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Passed to `python -u -c`; the target script is `sys.argv[1]`.
const TRACE_WRAPPER: &str = r#"
import builtins, importlib, os, sys
_err = sys.stderr
_seen = set()

def _emit(tag, name):
    if (tag, name) in _seen:
        return
    _seen.add((tag, name))
    try:
        _err.write(tag + name + "\n")
        _err.flush()
    except Exception:
        pass

_original_import = builtins.__import__

def _traced_import(name, globals=None, locals=None, fromlist=(), level=0):
    try:
        module = _original_import(name, globals, locals, fromlist, level)
    except ImportError:
        if level == 0 and name:
            _emit("__IMPORTSCOPE_MISSING__:", name)
        raise
    if level == 0 and name:
        _emit("__IMPORTSCOPE_TRACE__:", name)
    return module

_original_import_module = importlib.import_module

def _traced_import_module(name, package=None):
    try:
        module = _original_import_module(name, package)
    except ImportError:
        if not name.startswith("."):
            _emit("__IMPORTSCOPE_MISSING__:", name)
        raise
    if not name.startswith("."):
        _emit("__IMPORTSCOPE_TRACE__:", name)
    return module

_script = os.path.abspath(sys.argv[1])
sys.argv = [_script]
sys.path.insert(0, os.path.dirname(_script))
builtins.__import__ = _traced_import
importlib.import_module = _traced_import_module

try:
    with open(_script, "rb") as _fh:
        _code = compile(_fh.read(), _script, "exec")
    exec(_code, {"__name__": "__main__", "__file__": _script, "__builtins__": builtins})
except BaseException as _exc:
    _emit("__IMPORTSCOPE_ERROR__:", type(_exc).__name__)
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStatus {
    /// The child exited on its own; script exceptions are caught inside it
    Completed { exit_code: Option<i32> },
    TimedOut,
    Cancelled,
    LaunchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Imported(String),
    Missing(String),
    ScriptError(String),
}

/// Parse one stderr line from the wrapper; other output is ignored
pub fn parse_trace_line(line: &str) -> Option<TraceEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(name) = line.strip_prefix(TRACE_TAG) {
        Some(TraceEvent::Imported(name.trim().to_string()))
    } else if let Some(name) = line.strip_prefix(MISSING_TAG) {
        Some(TraceEvent::Missing(name.trim().to_string()))
    } else {
        line.strip_prefix(ERROR_TAG)
            .map(|kind| TraceEvent::ScriptError(kind.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOutcome {
    pub status: TraceStatus,
    /// Dotted names as imported
    pub imported: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Exception type that escaped the script, if any
    pub script_error: Option<String>,
    pub elapsed: Duration,
}

impl TraceOutcome {
    fn without_findings(status: TraceStatus, elapsed: Duration) -> Self {
        Self {
            status,
            imported: BTreeSet::new(),
            missing: BTreeSet::new(),
            script_error: None,
            elapsed,
        }
    }

    fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::Imported(name) => {
                self.imported.insert(name);
            }
            TraceEvent::Missing(name) => {
                self.missing.insert(name);
            }
            TraceEvent::ScriptError(kind) => self.script_error = Some(kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionTracer {
    interpreter: Option<PathBuf>,
    timeout: Duration,
}

impl ExecutionTracer {
    pub fn new(interpreter: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `script` under the tracing wrapper until it exits, the timeout
    /// elapses or `cancel` is set.
    pub fn trace(&self, script: &Path, cancel: &CancellationToken) -> TraceOutcome {
        let started = Instant::now();

        let interpreter = match resolve_interpreter(self.interpreter.as_deref()) {
            Ok(path) => path,
            Err(e) => {
                return TraceOutcome::without_findings(
                    TraceStatus::LaunchFailed(e.to_string()),
                    started.elapsed(),
                )
            }
        };
        let script = script
            .canonicalize()
            .unwrap_or_else(|_| script.to_path_buf());
        let working_dir = script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let spawned = Command::new(&interpreter)
            .arg("-u")
            .arg("-c")
            .arg(TRACE_WRAPPER)
            .arg(&script)
            .current_dir(&working_dir)
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return TraceOutcome::without_findings(
                    TraceStatus::LaunchFailed(format!(
                        "failed to launch {}: {}",
                        interpreter.display(),
                        e
                    )),
                    started.elapsed(),
                )
            }
        };
        tracing::debug!(pid = child.id(), script = %script.display(), "trace started");

        if let Some(mut stdout) = child.stdout.take() {
            std::thread::spawn(move || {
                let _ = std::io::copy(&mut stdout, &mut std::io::sink());
            });
        }
        let events = match child.stderr.take() {
            Some(stderr) => spawn_stderr_reader(stderr),
            None => channel::never(),
        };

        let deadline = started + self.timeout;
        let mut outcome =
            TraceOutcome::without_findings(TraceStatus::Completed { exit_code: None }, Duration::ZERO);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    drain_remaining(&events, &mut outcome);
                    outcome.status = TraceStatus::Completed {
                        exit_code: status.code(),
                    };
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    kill_and_reap(&mut child);
                    return TraceOutcome::without_findings(
                        TraceStatus::LaunchFailed(e.to_string()),
                        started.elapsed(),
                    );
                }
            }

            if cancel.is_cancelled() {
                kill_and_reap(&mut child);
                return TraceOutcome::without_findings(TraceStatus::Cancelled, started.elapsed());
            }
            if Instant::now() >= deadline {
                kill_and_reap(&mut child);
                tracing::warn!(
                    script = %script.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "execution trace timed out"
                );
                return TraceOutcome::without_findings(TraceStatus::TimedOut, started.elapsed());
            }

            match events.recv_timeout(POLL_INTERVAL) {
                Ok(event) => outcome.record(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(POLL_INTERVAL),
            }
        }

        outcome.elapsed = started.elapsed();
        outcome
    }
}

fn spawn_stderr_reader(stderr: impl Read + Send + 'static) -> Receiver<TraceEvent> {
    let (tx, rx) = channel::unbounded();
    std::thread::spawn(move || {
        let reader = BufReader::new(stderr);
        for line in reader.split(b'\n') {
            let Ok(bytes) = line else { break };
            let line = String::from_utf8_lossy(&bytes);
            if let Some(event) = parse_trace_line(&line) {
                if tx.send(event).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// Collect events still in flight after the child exited
fn drain_remaining(events: &Receiver<TraceEvent>, outcome: &mut TraceOutcome) {
    let grace_end = Instant::now() + DRAIN_GRACE;
    loop {
        let remaining = grace_end.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(event) => outcome.record(event),
            Err(_) => break,
        }
    }
}

impl DetectionStrategy for ExecutionTracer {
    fn id(&self) -> StrategyId {
        StrategyId::ExecutionTrace
    }

    fn analyze(&self, input: &SourceInput, cancel: &CancellationToken) -> StrategyOutput {
        let _phase = set_phase(AnalysisPhase::ExecutionTrace);
        let outcome = self.trace(&input.path, cancel);

        let status = match &outcome.status {
            TraceStatus::Completed { .. } => StrategyStatus::Succeeded,
            TraceStatus::TimedOut => StrategyStatus::TimedOut,
            TraceStatus::Cancelled => StrategyStatus::Cancelled,
            TraceStatus::LaunchFailed(reason) => StrategyStatus::Failed(reason.clone()),
        };
        if let Some(kind) = &outcome.script_error {
            tracing::info!(script = %input.path.display(), error = %kind, "traced script raised");
        }

        let findings: FindingSet = outcome
            .imported
            .iter()
            .filter_map(|name| ModuleRef::parse(name))
            .map(|module| {
                Finding::new(module, FindingContext::RuntimeTrace, StrategyId::ExecutionTrace)
            })
            .collect();
        let runtime_missing = outcome
            .missing
            .iter()
            .filter_map(|name| ModuleRef::parse(name))
            .map(|module| module.top_level().to_string())
            .collect();

        StrategyOutput {
            findings,
            status,
            runtime_missing,
        }
    }

    fn deadline(&self) -> Option<Duration> {
        Some(self.timeout + DEADLINE_GRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace_lines() {
        assert_eq!(
            parse_trace_line("__IMPORTSCOPE_TRACE__:json.decoder\n"),
            Some(TraceEvent::Imported("json.decoder".into()))
        );
        assert_eq!(
            parse_trace_line("__IMPORTSCOPE_MISSING__:nope\r\n"),
            Some(TraceEvent::Missing("nope".into()))
        );
        assert_eq!(
            parse_trace_line("__IMPORTSCOPE_ERROR__:SystemExit"),
            Some(TraceEvent::ScriptError("SystemExit".into()))
        );
        assert_eq!(parse_trace_line("Traceback (most recent call last):"), None);
    }

    #[test]
    fn test_launch_failure_is_reported() {
        let tracer = ExecutionTracer::new(
            Some(PathBuf::from("/no/such/interpreter")),
            Duration::from_secs(1),
        );
        let outcome = tracer.trace(Path::new("script.py"), &CancellationToken::new());
        assert!(matches!(outcome.status, TraceStatus::LaunchFailed(_)));
        assert!(outcome.imported.is_empty());
    }

    #[test]
    fn test_deadline_includes_grace() {
        let tracer = ExecutionTracer::new(None, Duration::from_secs(2));
        assert_eq!(tracer.deadline(), Some(Duration::from_secs(7)));
    }
}

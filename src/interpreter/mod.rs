//! Target interpreter resolution and probing.
//!
//! The probe asks the interpreter that will run the packaged program which
//! modules it can resolve and which belong to its standard library. The
//! stdlib list is memoized per interpreter for the life of the process;
//! module resolution is asked afresh every time, since installs and files
//! next to the script can change between analyses.

pub mod environments;
pub mod stdlib;

pub use environments::{
    discover_environments, discover_in, EnvironmentKind, PythonEnvironment, SearchRoots,
};
pub use stdlib::{fallback_stdlib, is_fallback_stdlib};

use crate::errors::{Error, Result};
use crossbeam::channel;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const PROBE_PROGRAM: &str = r#"
import importlib.util, json, sys
found = {}
for name in sys.argv[1:]:
    try:
        found[name] = importlib.util.find_spec(name) is not None
    except Exception:
        found[name] = False
names = getattr(sys, "stdlib_module_names", None)
json.dump({
    "version": sys.version.split()[0],
    "stdlib": sorted(names) if names else None,
    "found": found,
}, sys.stdout)
"#;

/// Locate the interpreter: an explicit path or command name, otherwise
/// `python3` then `python` on PATH.
pub fn resolve_interpreter(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.components().count() > 1 || path.is_absolute() {
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(Error::Interpreter(format!(
                    "{} does not exist",
                    path.display()
                )))
            };
        }
        return which::which(path)
            .map_err(|e| Error::Interpreter(format!("{}: {}", path.display(), e)));
    }

    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|_| Error::Interpreter("no python3 or python found on PATH".to_string()))
}

pub(crate) fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill failed (process may have exited): {}", e);
    }
    if let Err(e) = child.wait() {
        log::debug!("wait after kill failed: {}", e);
    }
}

/// Run a short-lived command and collect stdout, killing it at the deadline
fn run_with_deadline(mut command: Command, timeout: Duration) -> Result<String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Interpreter(format!("failed to launch probe: {}", e)))?;

    let (tx, rx) = channel::bounded(1);
    if let Some(mut stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            let mut buffer = String::new();
            let result = stdout.read_to_string(&mut buffer).map(|_| buffer);
            let _ = tx.send(result);
        });
    }

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_and_reap(&mut child);
                return Err(Error::Interpreter(format!(
                    "probe timed out after {}s",
                    timeout.as_secs()
                )));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(Error::Io(e));
            }
        }
    };

    if !status.success() {
        return Err(Error::Interpreter(format!("probe exited with {}", status)));
    }

    match rx.recv_timeout(Duration::from_secs(1)) {
        Ok(Ok(stdout)) => Ok(stdout),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => Err(Error::Interpreter("probe output was not received".to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct RawProbe {
    version: String,
    stdlib: Option<Vec<String>>,
    #[serde(default)]
    found: BTreeMap<String, bool>,
}

/// Answer for one set of module names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub missing: BTreeSet<String>,
    pub stdlib: Arc<BTreeSet<String>>,
    /// False when the static fallback list stands in for the interpreter's
    pub stdlib_reported: bool,
}

static STDLIB_MEMO: Lazy<DashMap<PathBuf, Arc<BTreeSet<String>>>> = Lazy::new(DashMap::new);
static FALLBACK_ARC: Lazy<Arc<BTreeSet<String>>> = Lazy::new(|| Arc::new(fallback_stdlib().clone()));

#[derive(Debug, Clone)]
pub struct InterpreterProbe {
    interpreter: PathBuf,
    timeout: Duration,
}

impl InterpreterProbe {
    pub fn new(interpreter: PathBuf) -> Self {
        Self {
            interpreter,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        resolve_interpreter(explicit).map(Self::new)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Stdlib names reported by this interpreter, or the fallback list
    /// when it has not been probed successfully.
    pub fn stdlib(&self) -> Arc<BTreeSet<String>> {
        STDLIB_MEMO
            .get(&self.interpreter)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_else(|| Arc::clone(&FALLBACK_ARC))
    }

    /// Which of `modules` the interpreter cannot find when run from `cwd`
    pub fn probe(&self, modules: &BTreeSet<String>, cwd: &Path) -> Result<ProbeReport> {
        let missing = if modules.is_empty() && STDLIB_MEMO.contains_key(&self.interpreter) {
            BTreeSet::new()
        } else {
            let mut command = Command::new(&self.interpreter);
            command
                .arg("-c")
                .arg(PROBE_PROGRAM)
                .args(modules.iter().map(String::as_str))
                .current_dir(cwd);
            let stdout = run_with_deadline(command, self.timeout)?;
            let raw: RawProbe = serde_json::from_str(stdout.trim())?;
            log::debug!(
                "Probed {} (Python {}) for {} modules",
                self.interpreter.display(),
                raw.version,
                modules.len()
            );

            let stdlib = match raw.stdlib {
                Some(names) => Arc::new(names.into_iter().collect()),
                None => Arc::clone(&FALLBACK_ARC),
            };
            STDLIB_MEMO.insert(self.interpreter.clone(), stdlib);
            raw.found
                .into_iter()
                .filter(|(name, found)| !found && modules.contains(name))
                .map(|(name, _)| name)
                .collect()
        };

        let stdlib = self.stdlib();
        let stdlib_reported = !Arc::ptr_eq(&stdlib, &FALLBACK_ARC);

        Ok(ProbeReport {
            missing,
            stdlib,
            stdlib_reported,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_path_is_error() {
        let err = resolve_interpreter(Some(Path::new("/no/such/python"))).unwrap_err();
        assert!(matches!(err, Error::Interpreter(_)));
    }

    #[test]
    fn test_unprobed_interpreter_uses_fallback_stdlib() {
        let probe = InterpreterProbe::new(PathBuf::from("/never/probed/python"));
        assert!(probe.stdlib().contains("os"));
    }

    #[test]
    fn test_probe_failure_is_an_error() {
        let probe = InterpreterProbe::new(PathBuf::from("/no/such/python"));
        let modules: BTreeSet<String> = ["requests".to_string()].into_iter().collect();
        assert!(probe.probe(&modules, Path::new(".")).is_err());
    }

    #[test]
    fn test_probe_real_interpreter() {
        let Ok(probe) = InterpreterProbe::resolve(None) else {
            eprintln!("no python interpreter on PATH; skipping");
            return;
        };
        let modules: BTreeSet<String> = ["os".to_string(), "surely_not_installed_xyz".to_string()]
            .into_iter()
            .collect();
        let report = probe.probe(&modules, Path::new(".")).unwrap();
        assert!(report.missing.contains("surely_not_installed_xyz"));
        assert!(!report.missing.contains("os"));
        assert!(report.stdlib.contains("os"));
    }

    #[test]
    fn test_module_written_after_a_miss_is_found() {
        let Ok(probe) = InterpreterProbe::resolve(None) else {
            eprintln!("no python interpreter on PATH; skipping");
            return;
        };
        let dir = tempfile::TempDir::new().unwrap();
        let modules: BTreeSet<String> = ["late_arrival_mod".to_string()].into_iter().collect();

        let before = probe.probe(&modules, dir.path()).unwrap();
        assert!(before.missing.contains("late_arrival_mod"));

        std::fs::write(dir.path().join("late_arrival_mod.py"), "VALUE = 1\n").unwrap();
        let after = probe.probe(&modules, dir.path()).unwrap();
        assert!(after.missing.is_empty());
    }
}

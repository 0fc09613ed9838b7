//! Discovery of the Python environments available on this machine.
//!
//! Looks at interpreters on PATH, the active virtual or conda environment,
//! environment containers under the home directory (virtualenvwrapper,
//! conda `envs/` directories) and environments inside the project.

use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const ENV_INTERPRETERS: &[&str] = &["Scripts/python.exe", "python.exe"];
#[cfg(not(windows))]
const ENV_INTERPRETERS: &[&str] = &["bin/python3", "bin/python"];

const PATH_INTERPRETERS: &[&str] = &["python3", "python"];

/// Project-relative directories that usually hold a virtual environment
const PROJECT_VENVS: &[&str] = &[".venv", "venv", "env"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    System,
    Conda,
    Venv,
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::System => "system",
            Self::Conda => "conda",
            Self::Venv => "venv",
        };
        f.pad(label)
    }
}

/// One interpreter that could run the packaged program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonEnvironment {
    pub kind: EnvironmentKind,
    pub name: String,
    pub interpreter: PathBuf,
    /// Environment directory; `None` for interpreters found on PATH
    pub root: Option<PathBuf>,
}

/// Places discovery looks at
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    /// PATH-style list searched for `python3` and `python`
    pub path_var: Option<OsString>,
    /// Environment directories checked directly
    pub environments: Vec<(EnvironmentKind, PathBuf)>,
    /// Directories whose subdirectories are environments
    pub containers: Vec<(EnvironmentKind, PathBuf)>,
}

impl SearchRoots {
    /// Roots for the current process environment and `project_dir`
    pub fn from_current_env(project_dir: &Path) -> Self {
        let mut environments = Vec::new();
        if let Some(venv) = std::env::var_os("VIRTUAL_ENV") {
            environments.push((EnvironmentKind::Venv, PathBuf::from(venv)));
        }
        if let Some(conda) = std::env::var_os("CONDA_PREFIX") {
            environments.push((EnvironmentKind::Conda, PathBuf::from(conda)));
        }
        for name in PROJECT_VENVS {
            environments.push((EnvironmentKind::Venv, project_dir.join(name)));
        }
        environments.push((EnvironmentKind::Conda, project_dir.join(".conda")));

        let mut containers = Vec::new();
        if let Some(home) = dirs::home_dir() {
            for base in ["miniconda3", "anaconda3"] {
                environments.push((EnvironmentKind::Conda, home.join(base)));
                containers.push((EnvironmentKind::Conda, home.join(base).join("envs")));
            }
            containers.push((EnvironmentKind::Conda, home.join(".conda").join("envs")));
            for dir in [".virtualenvs", "venvs", "envs"] {
                containers.push((EnvironmentKind::Venv, home.join(dir)));
            }
        }

        Self {
            path_var: std::env::var_os("PATH"),
            environments,
            containers,
        }
    }
}

/// Environments visible from the current process and `project_dir`
pub fn discover_environments(project_dir: &Path) -> Vec<PythonEnvironment> {
    discover_in(&SearchRoots::from_current_env(project_dir))
}

/// Environments under `roots`, sorted by kind then name. An interpreter
/// reachable several ways is listed once, under the first root that
/// found it; environment roots are checked before PATH.
pub fn discover_in(roots: &SearchRoots) -> Vec<PythonEnvironment> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |env: PythonEnvironment| {
        if seen.insert(identity(&env.interpreter)) {
            found.push(env);
        }
    };

    for (kind, root) in &roots.environments {
        if let Some(env) = environment_at(*kind, root) {
            push(env);
        }
    }

    for (kind, container) in &roots.containers {
        let Ok(entries) = fs::read_dir(container) else {
            continue;
        };
        let mut children: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        children.sort();
        for child in children {
            if let Some(env) = environment_at(*kind, &child) {
                push(env);
            }
        }
    }

    if let Some(path_var) = &roots.path_var {
        for name in PATH_INTERPRETERS {
            let Ok(hits) = which::which_in_all(name, Some(path_var), ".") else {
                continue;
            };
            for interpreter in hits {
                let dir = interpreter
                    .parent()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default();
                push(PythonEnvironment {
                    kind: EnvironmentKind::System,
                    name: format!("{} ({})", name, dir),
                    interpreter,
                    root: None,
                });
            }
        }
    }

    found.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
    log::debug!("Discovered {} Python environments", found.len());
    found
}

fn environment_at(kind: EnvironmentKind, root: &Path) -> Option<PythonEnvironment> {
    let interpreter = ENV_INTERPRETERS
        .iter()
        .map(|rel| root.join(rel))
        .find(|path| path.is_file())?;
    Some(PythonEnvironment {
        kind,
        name: environment_name(root),
        interpreter,
        root: Some(root.to_path_buf()),
    })
}

/// Directory name, qualified by the parent for generic names like `.venv`
fn environment_name(root: &Path) -> String {
    let own = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    let generic = PROJECT_VENVS.contains(&own.as_str()) || own == ".conda";
    match root.parent().and_then(Path::file_name) {
        Some(parent) if generic => format!("{}/{}", parent.to_string_lossy(), own),
        _ => own,
    }
}

/// Interpreter path with its directory resolved. The file itself is left
/// alone: a venv's `python` is a symlink to the base interpreter but is a
/// different environment.
fn identity(interpreter: &Path) -> PathBuf {
    let resolved_dir = interpreter.parent().and_then(|d| fs::canonicalize(d).ok());
    match (resolved_dir, interpreter.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => interpreter.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fake_env(root: &Path) -> PathBuf {
        let interpreter = root.join(ENV_INTERPRETERS[0]);
        fs::create_dir_all(interpreter.parent().unwrap()).unwrap();
        fs::write(&interpreter, "").unwrap();
        interpreter
    }

    #[test]
    fn test_environment_roots_and_containers() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let project_venv = project.path().join(".venv");
        fake_env(&project_venv);
        fake_env(&home.path().join("envs/data"));
        fake_env(&home.path().join("envs/analysis"));
        fs::create_dir_all(home.path().join("envs/broken")).unwrap();
        fake_env(&home.path().join("conda/envs/ml"));

        let roots = SearchRoots {
            path_var: None,
            environments: vec![
                (EnvironmentKind::Venv, project_venv.clone()),
                (EnvironmentKind::Venv, project.path().join("venv")),
            ],
            containers: vec![
                (EnvironmentKind::Venv, home.path().join("envs")),
                (EnvironmentKind::Conda, home.path().join("conda/envs")),
                (EnvironmentKind::Venv, home.path().join("missing")),
            ],
        };
        let found = discover_in(&roots);

        let summary: Vec<(EnvironmentKind, &str)> =
            found.iter().map(|e| (e.kind, e.name.as_str())).collect();
        let project_name = format!(
            "{}/.venv",
            project.path().file_name().unwrap().to_string_lossy()
        );
        assert_eq!(
            summary,
            vec![
                (EnvironmentKind::Conda, "ml"),
                (EnvironmentKind::Venv, project_name.as_str()),
                (EnvironmentKind::Venv, "analysis"),
                (EnvironmentKind::Venv, "data"),
            ]
        );
        assert_eq!(found[1].root.as_deref(), Some(project_venv.as_path()));
    }

    #[test]
    fn test_environment_reached_twice_is_listed_once() {
        let home = TempDir::new().unwrap();
        fake_env(&home.path().join("envs/web"));

        let roots = SearchRoots {
            path_var: None,
            environments: vec![(EnvironmentKind::Venv, home.path().join("envs/web"))],
            containers: vec![(EnvironmentKind::Venv, home.path().join("envs"))],
        };
        let found = discover_in(&roots);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "web");
    }

    #[cfg(unix)]
    #[test]
    fn test_interpreters_on_path_are_system() {
        use std::os::unix::fs::PermissionsExt;

        let bin = TempDir::new().unwrap();
        let python = bin.path().join("python3");
        fs::write(&python, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).unwrap();

        let roots = SearchRoots {
            path_var: Some(bin.path().as_os_str().to_os_string()),
            ..SearchRoots::default()
        };
        let found = discover_in(&roots);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, EnvironmentKind::System);
        assert_eq!(found[0].root, None);
        assert!(found[0].name.starts_with("python3 ("));
    }

    #[test]
    fn test_nothing_to_find() {
        assert!(discover_in(&SearchRoots::default()).is_empty());
    }
}

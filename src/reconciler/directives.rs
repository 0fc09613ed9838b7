//! Packaging directives derived from scored modules and matched frameworks.

use crate::core::{DataFile, ModuleAssessment, PackagingDirectives};
use crate::frameworks::FrameworkProfile;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Extensions of files bundled when they sit next to the script
pub const DATA_FILE_EXTENSIONS: &[&str] =
    &["json", "yaml", "yml", "toml", "ini", "cfg", "csv", "txt", "xml"];

/// True when `top_level` resolves to `x.py` or `x/__init__.py` in `script_dir`
pub fn is_local_module(top_level: &str, script_dir: &Path) -> bool {
    script_dir.join(format!("{}.py", top_level)).is_file()
        || script_dir.join(top_level).join("__init__.py").is_file()
}

/// Build hidden-import, collect-all and data-file directives.
///
/// Hidden imports are essential and recommended modules that are neither
/// part of the standard library nor local to the script, plus whatever the
/// matched frameworks import on their own.
pub fn build_directives(
    modules: &BTreeMap<String, ModuleAssessment>,
    frameworks: &[&FrameworkProfile],
    stdlib: &BTreeSet<String>,
    script_dir: &Path,
) -> PackagingDirectives {
    let mut hidden: BTreeSet<String> = modules
        .values()
        .filter(|m| m.tier.is_recommended_or_better())
        .filter(|m| !m.local && !stdlib.contains(&m.name))
        .map(|m| m.name.clone())
        .collect();
    hidden.extend(
        frameworks
            .iter()
            .flat_map(|f| f.hidden_imports.iter())
            .map(|s| s.to_string()),
    );

    let collect_all: BTreeSet<String> = frameworks
        .iter()
        .flat_map(|f| f.collect_all.iter())
        .map(|s| s.to_string())
        .collect();

    let mut data_files = framework_data_files(frameworks, script_dir);
    data_files.extend(adjacent_data_files(script_dir));

    PackagingDirectives {
        hidden_imports: hidden.into_iter().collect(),
        collect_all: collect_all.into_iter().collect(),
        data_files: data_files.into_iter().collect(),
    }
}

/// Framework data patterns that match something under `script_dir`
fn framework_data_files(frameworks: &[&FrameworkProfile], script_dir: &Path) -> BTreeSet<DataFile> {
    let base = glob::Pattern::escape(&script_dir.to_string_lossy());
    let mut found = BTreeSet::new();

    for pattern in frameworks.iter().flat_map(|f| f.data_files.iter()) {
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "skipping invalid data pattern");
                continue;
            }
        };
        for path in paths.flatten() {
            if let Some(data) = data_file(&path, script_dir) {
                found.insert(data);
            }
        }
    }
    found
}

/// Configuration and data files sitting directly next to the script
fn adjacent_data_files(script_dir: &Path) -> BTreeSet<DataFile> {
    let entries = match std::fs::read_dir(script_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %script_dir.display(), error = %e, "cannot list script directory");
            return BTreeSet::new();
        }
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_data_extension(path))
        .filter_map(|path| data_file(&path, script_dir))
        .collect()
}

fn has_data_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DATA_FILE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Directories keep their relative path as the bundle destination; files
/// land in their parent's relative directory.
fn data_file(path: &Path, script_dir: &Path) -> Option<DataFile> {
    let relative = path.strip_prefix(script_dir).ok()?;
    let destination: PathBuf = if path.is_dir() {
        relative.to_path_buf()
    } else {
        relative.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    let destination = match destination.to_string_lossy().replace('\\', "/") {
        d if d.is_empty() => ".".to_string(),
        d => d,
    };
    Some(DataFile {
        source: path.to_path_buf(),
        destination,
    })
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ImportscopeConfig, ParallelConfig};

pub const CONFIG_FILE_NAME: &str = "importscope.toml";
const MAX_TRAVERSAL_DEPTH: usize = 10;

/// `IMPORTSCOPE_*` variables captured once, so overrides are testable
/// without touching the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSnapshot {
    pub vars: HashMap<String, String>,
}

impl EnvironmentSnapshot {
    pub fn from_current_env() -> Self {
        let vars = std::env::vars()
            .filter(|(key, _)| key.starts_with("IMPORTSCOPE_"))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// `Some(true)` for 1/true/yes/on, `Some(false)` for 0/false/no/off
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            other => {
                log::warn!("Ignoring {}={}: not a boolean", key, other);
                None
            }
        }
    }

    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring {}={}: could not parse value", key, raw);
                None
            }
        }
    }
}

pub fn parse_config(contents: &str) -> Result<ImportscopeConfig, toml::de::Error> {
    toml::from_str(contents)
}

fn try_load_config_from_path(config_path: &Path) -> Option<ImportscopeConfig> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
            }
            return None;
        }
    };

    match parse_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!(
                "Failed to parse {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            None
        }
    }
}

pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find `importscope.toml` in `start` or one of its ancestors
pub fn load_config_from(start: &Path) -> ImportscopeConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No {} found from {}. Using default config.",
                CONFIG_FILE_NAME,
                start.display()
            );
            ImportscopeConfig::default()
        })
}

/// Apply `IMPORTSCOPE_*` overrides on top of file settings
pub fn apply_env_overrides(config: &mut ImportscopeConfig, env: &EnvironmentSnapshot) {
    let analysis = &mut config.analysis;
    if let Some(execute) = env.flag("IMPORTSCOPE_EXECUTE") {
        analysis.use_execution_trace = execute;
    }
    if let Some(secs) = env.parse::<u64>("IMPORTSCOPE_TIMEOUT") {
        analysis.execution_timeout_secs = secs;
    }
    if let Some(jobs) = env.parse::<usize>("IMPORTSCOPE_JOBS") {
        analysis.parallel = ParallelConfig::with_workers(jobs);
    }
    if let Some(python) = env.get("IMPORTSCOPE_PYTHON").filter(|p| !p.is_empty()) {
        analysis.interpreter = Some(PathBuf::from(python));
    }

    let cache = &mut config.cache;
    if let Some(dir) = env.get("IMPORTSCOPE_CACHE_DIR").filter(|p| !p.is_empty()) {
        cache.directory = Some(PathBuf::from(dir));
    }
    if let Some(disabled) = env.flag("IMPORTSCOPE_NO_CACHE") {
        cache.enabled = !disabled;
    }
    if let Some(ttl) = env.parse::<u64>("IMPORTSCOPE_CACHE_TTL") {
        cache.default_ttl_secs = ttl;
    }
}

/// File config for `start`, then environment overrides
pub fn load_config(start: &Path) -> ImportscopeConfig {
    let mut config = load_config_from(start);
    apply_env_overrides(&mut config, &EnvironmentSnapshot::from_current_env());
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_found_in_ancestor() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "[analysis]\nuse_execution_trace = true\n",
        )
        .unwrap();
        let nested = root.path().join("app").join("scripts");
        fs::create_dir_all(&nested).unwrap();

        let config = load_config_from(&nested);
        assert!(config.analysis.use_execution_trace);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(CONFIG_FILE_NAME), "[analysis\n").unwrap();
        let config = load_config_from(root.path());
        assert_eq!(config, ImportscopeConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ImportscopeConfig::default();
        let env = EnvironmentSnapshot::from_pairs([
            ("IMPORTSCOPE_EXECUTE", "yes"),
            ("IMPORTSCOPE_TIMEOUT", "5"),
            ("IMPORTSCOPE_JOBS", "2"),
            ("IMPORTSCOPE_NO_CACHE", "1"),
            ("IMPORTSCOPE_CACHE_TTL", "not-a-number"),
        ]);
        apply_env_overrides(&mut config, &env);

        assert!(config.analysis.use_execution_trace);
        assert_eq!(config.analysis.execution_timeout_secs, 5);
        assert_eq!(config.analysis.max_parallel_workers(), 2);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.default_ttl_secs, 3600);
    }

    #[test]
    fn test_ancestors_bounded() {
        let dirs: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c/d"), 2).collect();
        assert_eq!(dirs, vec![PathBuf::from("/a/b/c/d"), PathBuf::from("/a/b/c")]);
    }
}

//! Entry point for analyzing scripts, with optional result caching.

use crate::analyzers::{CancellationToken, SourceInput};
use crate::cache::{CacheKey, LayeredCache};
use crate::config::AnalysisConfig;
use crate::core::{AnalysisResult, Detection};
use crate::errors::Result;
use crate::observability::{set_current_script, set_phase, AnalysisPhase};
use crate::reconciler::recommendations::{cache_recommendation, slow_analysis_recommendation};
use crate::reconciler::Reconciler;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Tag carried by every cached analysis
pub const ANALYSIS_TAG: &str = "analysis";

/// Analyzes Python scripts and caches the results by content
pub struct DependencyAnalyzer {
    reconciler: Reconciler,
    cache: Option<Arc<LayeredCache>>,
}

impl DependencyAnalyzer {
    /// Analyzer for a validated configuration, without a cache
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_reconciler(Reconciler::new(config)))
    }

    pub fn with_reconciler(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<LayeredCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.reconciler.config()
    }

    pub fn cache(&self) -> Option<&Arc<LayeredCache>> {
        self.cache.as_ref()
    }

    pub fn analyze(&self, path: &Path) -> Result<AnalysisResult> {
        self.analyze_with_cancel(path, &CancellationToken::new())
    }

    /// Read and analyze one script. Only an unreadable script is an error.
    pub fn analyze_with_cancel(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let _script = set_current_script(path);
        let input = {
            let _phase = set_phase(AnalysisPhase::Reading);
            SourceInput::from_path(path)?
        };
        Ok(self.analyze_source(&input, cancel))
    }

    /// Analyze an already loaded script, consulting the cache first.
    ///
    /// Only the detection is cached. Local modules, missing modules,
    /// directives and recommendations are always derived against the
    /// script's own directory.
    pub fn analyze_source(&self, input: &SourceInput, cancel: &CancellationToken) -> AnalysisResult {
        let key = CacheKey::for_content_hash(&input.content_hash, self.config());

        let cached = self.cache.as_ref().and_then(|cache| {
            let _phase = set_phase(AnalysisPhase::Caching);
            cache.get_json::<Detection>(key.as_str())
        });

        let mut result = match cached {
            Some(mut detection) => {
                log::debug!("Cache hit for {}", input.path.display());
                detection.elapsed_ms = 0;
                self.reconciler.complete(detection, input).served_from_cache()
            }
            None => {
                let detection = self.reconciler.detect(input, cancel);
                if let Some(cache) = &self.cache {
                    self.store(cache, &key, &input.path, &detection);
                }
                let mut result = self.reconciler.complete(detection, input);
                let elapsed = Duration::from_millis(result.elapsed_ms);
                result.recommendations.extend(slow_analysis_recommendation(elapsed));
                result
            }
        };

        if let Some(cache) = &self.cache {
            result
                .recommendations
                .extend(cache_recommendation(&cache.stats()));
        }
        result
    }

    fn store(&self, cache: &LayeredCache, key: &CacheKey, script: &Path, detection: &Detection) {
        if detection.is_interrupted() {
            log::debug!("Not caching interrupted analysis of {}", script.display());
            return;
        }

        let _phase = set_phase(AnalysisPhase::Caching);
        let tags = vec![ANALYSIS_TAG.to_string(), script_tag(script)];
        if let Err(e) = cache.set_json(key.as_str(), detection, None, &tags) {
            log::warn!("Failed to cache analysis of {}: {}", script.display(), e);
        }
    }

    /// Analyze several scripts in order. Stops starting new scripts once
    /// `cancel` fires; scripts never started are absent from the output.
    pub fn analyze_batch(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
        progress: &ProgressBar,
    ) -> Vec<(PathBuf, Result<AnalysisResult>)> {
        progress.set_length(paths.len() as u64);
        progress.set_message("Analyzing");

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            if cancel.is_cancelled() {
                log::info!("Batch cancelled before {}", path.display());
                break;
            }
            let outcome = self.analyze_with_cancel(path, cancel);
            if let Err(e) = &outcome {
                log::warn!("Skipping {}: {}", path.display(), e);
            }
            results.push((path.clone(), outcome));
            progress.inc(1);
        }

        progress.finish_and_clear();
        results
    }
}

/// Tag identifying cached analyses of one script path
pub fn script_tag(path: &Path) -> String {
    format!("script:{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::errors::Error;
    use std::fs;
    use tempfile::TempDir;

    fn static_config() -> AnalysisConfig {
        AnalysisConfig {
            check_missing_modules: false,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = static_config();
        config.execution_timeout_secs = 0;
        assert!(matches!(
            DependencyAnalyzer::new(config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_script_is_input_error() {
        let analyzer = DependencyAnalyzer::new(static_config()).unwrap();
        let err = analyzer.analyze(Path::new("/no/such/script.py")).unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
    }

    #[test]
    fn test_second_analysis_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("app.py");
        fs::write(&script, "import os\nimport requests\n").unwrap();

        let cache_config = CacheConfig {
            sweep_interval_secs: 0,
            ..CacheConfig::in_directory(dir.path().join("cache"))
        };
        let cache = Arc::new(LayeredCache::open(&cache_config).unwrap());
        let analyzer = DependencyAnalyzer::new(static_config())
            .unwrap()
            .with_cache(Arc::clone(&cache));

        let first = analyzer.analyze(&script).unwrap();
        let second = analyzer.analyze(&script).unwrap();
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.module_names(), second.module_names());
        assert_eq!(first.tiers, second.tiers);
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[test]
    fn test_batch_stops_after_cancel() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("s{}.py", i));
                fs::write(&path, "import os\n").unwrap();
                path
            })
            .collect();

        let analyzer = DependencyAnalyzer::new(static_config()).unwrap();
        let cancel = CancellationToken::new();
        let all = analyzer.analyze_batch(&paths, &cancel, &ProgressBar::hidden());
        assert_eq!(all.len(), 3);

        cancel.cancel();
        let none = analyzer.analyze_batch(&paths, &cancel, &ProgressBar::hidden());
        assert!(none.is_empty());
    }
}

//! Multi-strategy reconciliation.
//!
//! Detection runs the enabled strategies, merges their findings, scores
//! every module and applies framework knowledge. Completion checks the
//! target interpreter for missing modules and derives packaging directives
//! for the script's directory. Only an unreadable script is an error;
//! every other problem degrades into the result.

pub mod directives;
pub mod dispatch;
pub mod recommendations;
pub mod scoring;

pub use directives::{build_directives, is_local_module};
pub use dispatch::{Dispatcher, StrategyRun};
pub use recommendations::{cache_recommendation, recommend, RecommendationInputs};
pub use scoring::{accumulate, assess, partition, score_findings, ModuleEvidence};

use crate::analyzers::{
    CancellationToken, DetectionStrategy, ExecutionTracer, HeuristicNameFilter, SourceInput,
    SyntaxTreeScanner, TextualMatcher,
};
use crate::config::AnalysisConfig;
use crate::core::{
    AnalysisResult, Detection, Finding, FindingContext, FindingSet, ModuleAssessment, ModuleRef, StrategyId,
    StrategyReport, StrategyStatus,
};
use crate::frameworks::{FrameworkKnowledgeBase, FrameworkProfile};
use crate::interpreter::{fallback_stdlib, InterpreterProbe};
use crate::observability::{set_current_script, set_phase, AnalysisPhase};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Combines strategy output into an [`AnalysisResult`]
pub struct Reconciler {
    config: AnalysisConfig,
    strategies: Vec<Arc<dyn DetectionStrategy>>,
    /// Built-in strategies turned off by configuration
    skipped: Vec<StrategyId>,
    knowledge: &'static FrameworkKnowledgeBase,
    dispatcher: Dispatcher,
}

impl Reconciler {
    /// Reconciler running the built-in strategies enabled in `config`
    pub fn new(config: AnalysisConfig) -> Self {
        let mut strategies: Vec<Arc<dyn DetectionStrategy>> = Vec::new();
        let mut skipped = Vec::new();

        if config.use_syntax_tree {
            strategies.push(Arc::new(SyntaxTreeScanner::new()));
        } else {
            skipped.push(StrategyId::SyntaxTree);
        }
        if config.use_textual {
            let filter = HeuristicNameFilter::from_config(&config.name_filter);
            strategies.push(Arc::new(TextualMatcher::new(Arc::new(filter))));
        } else {
            skipped.push(StrategyId::Textual);
        }
        if config.use_execution_trace {
            strategies.push(Arc::new(ExecutionTracer::new(
                config.interpreter.clone(),
                config.execution_timeout(),
            )));
        } else {
            skipped.push(StrategyId::ExecutionTrace);
        }

        let mut reconciler = Self::with_strategies(config, strategies);
        reconciler.skipped = skipped;
        reconciler
    }

    /// Reconciler over an explicit strategy list
    pub fn with_strategies(
        config: AnalysisConfig,
        strategies: Vec<Arc<dyn DetectionStrategy>>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            config.max_parallel_workers(),
            config.parallel.enabled,
            config.strategy_timeout(),
        );
        Self {
            config,
            strategies,
            skipped: Vec::new(),
            knowledge: FrameworkKnowledgeBase::builtin(),
            dispatcher,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one loaded script
    pub fn reconcile(&self, input: &SourceInput, cancel: &CancellationToken) -> AnalysisResult {
        let detection = self.detect(input, cancel);
        self.complete(detection, input)
    }

    /// Run the strategies, score their findings and apply framework
    /// knowledge. The outcome depends only on the script content and the
    /// configuration.
    pub fn detect(&self, input: &SourceInput, cancel: &CancellationToken) -> Detection {
        let started = Instant::now();
        let span = info_span!(
            "detect",
            script = %input.path.display(),
            strategies = self.strategies.len(),
        );
        let _span = span.enter();
        let _script = set_current_script(&input.path);

        let runs = match self.dispatcher.run(&self.strategies, input, cancel) {
            Ok(runs) => runs,
            Err(e) => {
                warn!(error = %e, "falling back to sequential strategy execution");
                Dispatcher::new(1, false, self.config.strategy_timeout()).run_sequential(
                    &self.strategies,
                    input,
                    cancel,
                )
            }
        };

        let _phase = set_phase(AnalysisPhase::Reconciling);
        let mut findings = FindingSet::new();
        let mut runtime_missing = BTreeSet::new();
        let mut reports = Vec::with_capacity(runs.len() + self.skipped.len() + 1);
        let mut parse_error = None;

        for run in runs {
            if run.strategy == StrategyId::SyntaxTree {
                if let StrategyStatus::Degraded(reason) = &run.output.status {
                    parse_error = Some(reason.clone());
                }
            }
            reports.push(report(
                run.strategy,
                run.output.status,
                &run.output.findings,
                run.elapsed.as_millis() as u64,
            ));
            findings.extend(run.output.findings);
            runtime_missing.extend(run.output.runtime_missing);
        }
        reports.extend(self.skipped.iter().map(|&id| skipped_report(id)));

        let mut modules =
            score_findings(findings.iter().cloned(), &self.config.weights, &self.config.thresholds);

        let frameworks = if self.config.use_framework_matching {
            let framework_start = Instant::now();
            let (frameworks, implied) = self.match_frameworks(&modules);
            reports.push(report(
                StrategyId::FrameworkMatching,
                StrategyStatus::Succeeded,
                &implied,
                framework_start.elapsed().as_millis() as u64,
            ));
            if !implied.is_empty() {
                findings.extend(implied);
                modules = score_findings(
                    findings.iter().cloned(),
                    &self.config.weights,
                    &self.config.thresholds,
                );
            }
            frameworks
        } else {
            reports.push(skipped_report(StrategyId::FrameworkMatching));
            Vec::new()
        };

        Detection {
            content_hash: input.content_hash.clone(),
            modules,
            frameworks: frameworks.iter().map(|f| f.name.to_string()).collect(),
            runtime_missing: runtime_missing.into_iter().collect(),
            strategies: reports,
            parse_error,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Resolve a detection against the script's directory: local modules,
    /// missing modules, packaging directives and recommendations
    pub fn complete(&self, detection: Detection, input: &SourceInput) -> AnalysisResult {
        let started = Instant::now();
        let span = info_span!("complete", script = %input.path.display());
        let _span = span.enter();
        let _script = set_current_script(&input.path);
        let script_dir = input.script_dir();

        let Detection {
            content_hash,
            mut modules,
            frameworks: framework_names,
            runtime_missing,
            strategies: reports,
            parse_error,
            elapsed_ms: detect_ms,
        } = detection;

        let frameworks: Vec<&'static FrameworkProfile> = framework_names
            .iter()
            .filter_map(|name| self.knowledge.get(name))
            .collect();

        for assessment in modules.values_mut() {
            assessment.local = is_local_module(&assessment.name, &script_dir);
            assessment.missing = false;
        }

        let (stdlib, probe_error) = self.probe_missing(&mut modules, &script_dir);
        let missing_modules: Vec<String> = modules
            .values()
            .filter(|m| m.missing)
            .map(|m| m.name.clone())
            .collect();

        let directives = build_directives(&modules, &frameworks, &stdlib, &script_dir);
        let tiers = partition(&modules);
        let module_names: BTreeSet<&str> = modules.keys().map(String::as_str).collect();
        let conflicts = self.knowledge.conflicts(&module_names);

        let recommendations = recommend(&RecommendationInputs {
            missing_modules: &missing_modules,
            runtime_missing: &runtime_missing,
            module_count: modules.len(),
            large_module_count: self.config.large_module_count,
            essential_count: tiers.essential.len(),
            execution_trace_enabled: self.config.use_execution_trace,
            reports: &reports,
            frameworks: &frameworks,
            conflicts: &conflicts,
            probe_error: probe_error.as_deref(),
        });

        info!(
            modules = modules.len(),
            essential = tiers.essential.len(),
            frameworks = frameworks.len(),
            missing = missing_modules.len(),
            "reconciliation complete"
        );

        AnalysisResult {
            script: input.path.clone(),
            content_hash,
            analyzed_at: Utc::now(),
            modules,
            tiers,
            frameworks: framework_names,
            directives,
            missing_modules,
            runtime_missing,
            recommendations,
            strategies: reports,
            parse_error,
            cache_hit: false,
            elapsed_ms: detect_ms + started.elapsed().as_millis() as u64,
        }
    }

    /// Profiles matched by recommended-or-better modules, plus findings for
    /// the companion packages those profiles load
    fn match_frameworks(
        &self,
        modules: &BTreeMap<String, ModuleAssessment>,
    ) -> (Vec<&'static FrameworkProfile>, FindingSet) {
        let _phase = set_phase(AnalysisPhase::FrameworkMatching);
        let confident: BTreeSet<ModuleRef> = modules
            .values()
            .filter(|m| m.tier.is_recommended_or_better())
            .filter_map(|m| ModuleRef::parse(&m.name))
            .collect();

        let frameworks = self.knowledge.lookup(&confident);
        let implied: FindingSet = frameworks
            .iter()
            .flat_map(|f| f.companions.iter())
            .filter_map(|name| ModuleRef::parse(name))
            .map(|module| {
                Finding::new(
                    module,
                    FindingContext::FrameworkImplied,
                    StrategyId::FrameworkMatching,
                )
            })
            .collect();

        debug!(
            frameworks = ?frameworks.iter().map(|f| f.name).collect::<Vec<_>>(),
            companions = implied.len(),
            "framework matching"
        );
        (frameworks, implied)
    }

    /// Mark modules the target interpreter cannot import. Returns the stdlib
    /// names to exclude from hidden imports and the probe error, if any.
    fn probe_missing(
        &self,
        modules: &mut BTreeMap<String, ModuleAssessment>,
        script_dir: &Path,
    ) -> (BTreeSet<String>, Option<String>) {
        if !self.config.check_missing_modules {
            return (fallback_stdlib().clone(), None);
        }
        let _phase = set_phase(AnalysisPhase::Probing);

        let probe = match InterpreterProbe::resolve(self.config.interpreter.as_deref()) {
            Ok(probe) => probe,
            Err(e) => {
                warn!(error = %e, "no interpreter to probe");
                return (fallback_stdlib().clone(), Some(e.to_string()));
            }
        };

        // Stdlib membership is known up front only when an earlier probe
        // of this interpreter reported it; the fallback list covers the rest
        let known_stdlib = probe.stdlib();
        let candidates: BTreeSet<String> = modules
            .values()
            .filter(|m| !m.local && !known_stdlib.contains(&m.name))
            .map(|m| m.name.clone())
            .collect();

        match probe.probe(&candidates, script_dir) {
            Ok(report) => {
                for name in &report.missing {
                    if report.stdlib.contains(name) {
                        continue;
                    }
                    if let Some(assessment) = modules.get_mut(name) {
                        assessment.missing = true;
                    }
                }
                ((*report.stdlib).clone(), None)
            }
            Err(e) => {
                warn!(error = %e, interpreter = %probe.interpreter().display(), "interpreter probe failed");
                (fallback_stdlib().clone(), Some(e.to_string()))
            }
        }
    }
}

fn report(
    strategy: StrategyId,
    status: StrategyStatus,
    findings: &FindingSet,
    elapsed_ms: u64,
) -> StrategyReport {
    StrategyReport {
        strategy,
        status,
        findings: findings.len(),
        modules: findings
            .iter()
            .map(|f| f.module.top_level().to_string())
            .collect(),
        elapsed_ms,
    }
}

fn skipped_report(strategy: StrategyId) -> StrategyReport {
    report(strategy, StrategyStatus::Skipped, &FindingSet::new(), 0)
}

//! Confidence weighting configuration
//!
//! A finding contributes `strategy_weight * context_weight` to its module's
//! raw score. The numeric defaults are empirical; only the ordering
//! execution-trace > syntax-tree > framework-matching > textual is enforced.

use crate::core::{Finding, FindingContext, StrategyId, TextualPattern};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Trust weight per strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    #[serde(default = "default_syntax_tree_weight")]
    pub syntax_tree: f64,

    #[serde(default = "default_execution_trace_weight")]
    pub execution_trace: f64,

    #[serde(default = "default_framework_weight")]
    pub framework_matching: f64,
}

fn default_syntax_tree_weight() -> f64 {
    0.9
}

fn default_execution_trace_weight() -> f64 {
    0.95
}

fn default_framework_weight() -> f64 {
    0.6
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            syntax_tree: default_syntax_tree_weight(),
            execution_trace: default_execution_trace_weight(),
            framework_matching: default_framework_weight(),
        }
    }
}

/// Trust weight per textual rule; these stand in for the strategy weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextualWeights {
    #[serde(default = "default_dynamic_import_weight")]
    pub import_module_call: f64,

    #[serde(default = "default_dynamic_import_weight")]
    pub dunder_import_call: f64,

    #[serde(default = "default_indirect_weight")]
    pub spec_lookup: f64,

    #[serde(default = "default_indirect_weight")]
    pub exec_string: f64,

    #[serde(default = "default_loose_weight")]
    pub reflective_access: f64,

    #[serde(default = "default_plugin_weight")]
    pub plugin_loader: f64,

    #[serde(default = "default_loose_weight")]
    pub config_map: f64,
}

fn default_dynamic_import_weight() -> f64 {
    0.58
}

fn default_indirect_weight() -> f64 {
    0.55
}

fn default_plugin_weight() -> f64 {
    0.52
}

fn default_loose_weight() -> f64 {
    0.5
}

impl Default for TextualWeights {
    fn default() -> Self {
        Self {
            import_module_call: default_dynamic_import_weight(),
            dunder_import_call: default_dynamic_import_weight(),
            spec_lookup: default_indirect_weight(),
            exec_string: default_indirect_weight(),
            reflective_access: default_loose_weight(),
            plugin_loader: default_plugin_weight(),
            config_map: default_loose_weight(),
        }
    }
}

impl TextualWeights {
    pub fn get(&self, pattern: TextualPattern) -> f64 {
        match pattern {
            TextualPattern::ImportModuleCall => self.import_module_call,
            TextualPattern::DunderImportCall => self.dunder_import_call,
            TextualPattern::SpecLookup => self.spec_lookup,
            TextualPattern::ExecString => self.exec_string,
            TextualPattern::ReflectiveAccess => self.reflective_access,
            TextualPattern::PluginLoader => self.plugin_loader,
            TextualPattern::ConfigMap => self.config_map,
        }
    }

    fn values(&self) -> [f64; 7] {
        [
            self.import_module_call,
            self.dunder_import_call,
            self.spec_lookup,
            self.exec_string,
            self.reflective_access,
            self.plugin_loader,
            self.config_map,
        ]
    }

    fn max(&self) -> f64 {
        self.values().into_iter().fold(0.0, f64::max)
    }
}

/// Attenuation per lexical or runtime context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextWeights {
    #[serde(default = "default_top_level")]
    pub top_level_import: f64,

    #[serde(default = "default_conditional")]
    pub conditional_branch: f64,

    #[serde(default = "default_exception_handler")]
    pub exception_handler: f64,

    #[serde(default = "default_conditional")]
    pub function_body: f64,

    #[serde(default = "default_class_body")]
    pub class_body: f64,

    #[serde(default = "default_class_body")]
    pub dynamic_call: f64,

    #[serde(default = "default_textual_reference")]
    pub textual_reference: f64,

    #[serde(default = "default_runtime_trace")]
    pub runtime_trace: f64,

    #[serde(default = "default_framework_implied")]
    pub framework_implied: f64,
}

fn default_top_level() -> f64 {
    0.9
}

fn default_conditional() -> f64 {
    0.7
}

fn default_exception_handler() -> f64 {
    0.6
}

fn default_class_body() -> f64 {
    0.8
}

fn default_textual_reference() -> f64 {
    0.5
}

fn default_runtime_trace() -> f64 {
    0.95
}

fn default_framework_implied() -> f64 {
    0.6
}

impl Default for ContextWeights {
    fn default() -> Self {
        Self {
            top_level_import: default_top_level(),
            conditional_branch: default_conditional(),
            exception_handler: default_exception_handler(),
            function_body: default_conditional(),
            class_body: default_class_body(),
            dynamic_call: default_class_body(),
            textual_reference: default_textual_reference(),
            runtime_trace: default_runtime_trace(),
            framework_implied: default_framework_implied(),
        }
    }
}

impl ContextWeights {
    pub fn get(&self, context: FindingContext) -> f64 {
        match context {
            FindingContext::TopLevelImport => self.top_level_import,
            FindingContext::ConditionalBranch => self.conditional_branch,
            FindingContext::ExceptionHandler => self.exception_handler,
            FindingContext::FunctionBody => self.function_body,
            FindingContext::ClassBody => self.class_body,
            FindingContext::DynamicCall => self.dynamic_call,
            FindingContext::TextualReference => self.textual_reference,
            FindingContext::RuntimeTrace => self.runtime_trace,
            FindingContext::FrameworkImplied => self.framework_implied,
        }
    }
}

/// All weights used when accumulating confidence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    #[serde(default)]
    pub strategies: StrategyWeights,

    #[serde(default)]
    pub textual: TextualWeights,

    #[serde(default)]
    pub contexts: ContextWeights,
}

impl ConfidenceWeights {
    /// Contribution of one finding to its module's raw score
    pub fn contribution(&self, finding: &Finding) -> f64 {
        self.strategy_weight(finding) * self.contexts.get(finding.context)
    }

    fn strategy_weight(&self, finding: &Finding) -> f64 {
        match finding.strategy {
            StrategyId::SyntaxTree => self.strategies.syntax_tree,
            StrategyId::ExecutionTrace => self.strategies.execution_trace,
            StrategyId::FrameworkMatching => self.strategies.framework_matching,
            StrategyId::Textual => finding
                .pattern
                .map(|p| self.textual.get(p))
                .unwrap_or(self.textual.config_map),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let all_positive = [
            self.strategies.syntax_tree,
            self.strategies.execution_trace,
            self.strategies.framework_matching,
        ]
        .into_iter()
        .chain(self.textual.values())
        .chain(FindingContext::ALL.iter().map(|c| self.contexts.get(*c)))
        .all(|w| w > 0.0 && w <= 1.0);

        if !all_positive {
            return Err(Error::Configuration(
                "confidence weights must be within (0.0, 1.0]".to_string(),
            ));
        }

        let s = &self.strategies;
        if !(s.execution_trace > s.syntax_tree
            && s.syntax_tree > s.framework_matching
            && s.framework_matching > self.textual.max())
        {
            return Err(Error::Configuration(
                "strategy weights must keep execution-trace > syntax-tree > framework-matching > textual"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

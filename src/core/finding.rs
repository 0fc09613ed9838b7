use super::ModuleRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where a module reference was encountered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingContext {
    TopLevelImport,
    ConditionalBranch,
    ExceptionHandler,
    FunctionBody,
    ClassBody,
    DynamicCall,
    TextualReference,
    RuntimeTrace,
    FrameworkImplied,
}

impl FindingContext {
    pub const ALL: [FindingContext; 9] = [
        Self::TopLevelImport,
        Self::ConditionalBranch,
        Self::ExceptionHandler,
        Self::FunctionBody,
        Self::ClassBody,
        Self::DynamicCall,
        Self::TextualReference,
        Self::RuntimeTrace,
        Self::FrameworkImplied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLevelImport => "top-level-import",
            Self::ConditionalBranch => "conditional-branch",
            Self::ExceptionHandler => "exception-handler",
            Self::FunctionBody => "function-body",
            Self::ClassBody => "class-body",
            Self::DynamicCall => "dynamic-call",
            Self::TextualReference => "textual-reference",
            Self::RuntimeTrace => "runtime-trace",
            Self::FrameworkImplied => "framework-implied",
        }
    }
}

impl fmt::Display for FindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the strategy that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    SyntaxTree,
    Textual,
    ExecutionTrace,
    FrameworkMatching,
}

impl StrategyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyntaxTree => "syntax-tree",
            Self::Textual => "textual",
            Self::ExecutionTrace => "execution-trace",
            Self::FrameworkMatching => "framework-matching",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which textual rule matched. Each rule carries its own trust weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextualPattern {
    ImportModuleCall,
    DunderImportCall,
    SpecLookup,
    ExecString,
    ReflectiveAccess,
    PluginLoader,
    ConfigMap,
}

impl TextualPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImportModuleCall => "import-module-call",
            Self::DunderImportCall => "dunder-import-call",
            Self::SpecLookup => "spec-lookup",
            Self::ExecString => "exec-string",
            Self::ReflectiveAccess => "reflective-access",
            Self::PluginLoader => "plugin-loader",
            Self::ConfigMap => "config-map",
        }
    }
}

/// One strategy's evidence that a module is referenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Finding {
    pub module: ModuleRef,
    pub context: FindingContext,
    pub strategy: StrategyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<TextualPattern>,
}

impl Finding {
    pub fn new(module: ModuleRef, context: FindingContext, strategy: StrategyId) -> Self {
        Self {
            module,
            context,
            strategy,
            pattern: None,
        }
    }

    pub fn textual(module: ModuleRef, pattern: TextualPattern) -> Self {
        Self {
            module,
            context: FindingContext::TextualReference,
            strategy: StrategyId::Textual,
            pattern: Some(pattern),
        }
    }
}

/// Findings deduplicated by (module, context, strategy, pattern)
pub type FindingSet = BTreeSet<Finding>;

/// Distinct top-level modules in a finding set
pub fn modules_of<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> BTreeSet<ModuleRef> {
    findings
        .into_iter()
        .map(|f| f.module.to_top_level())
        .collect()
}

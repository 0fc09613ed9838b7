use crate::config::{ImportscopeConfig, ParallelConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "importscope")]
#[command(about = "Detect the modules a Python program imports, for packaging", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one or more Python scripts
    Analyze(AnalyzeArgs),

    /// Inspect or clear the analysis cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// List the Python environments found on this machine
    Envs {
        /// Project directory searched for local environments
        #[arg(default_value = ".")]
        project: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Entry-point scripts to analyze
    #[arg(required = true)]
    pub scripts: Vec<PathBuf>,

    /// Run each script under an import tracer (executes the script)
    #[arg(long)]
    pub execute: bool,

    /// Disable textual pattern matching
    #[arg(long = "no-textual")]
    pub no_textual: bool,

    /// Disable framework matching
    #[arg(long = "no-frameworks")]
    pub no_frameworks: bool,

    /// Execution trace timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum parallel strategy workers (0 = one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Python interpreter used for tracing and probing
    #[arg(long, env = "IMPORTSCOPE_PYTHON")]
    pub python: Option<PathBuf>,

    /// Bypass the result cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Print results as JSON
    #[arg(long, conflicts_with = "args")]
    pub json: bool,

    /// Print only packaging-tool arguments
    #[arg(long)]
    pub args: bool,

    /// Explicit config file instead of searching for importscope.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl AnalyzeArgs {
    /// Apply command-line flags over file and environment settings
    pub fn apply_to(&self, config: &mut ImportscopeConfig) {
        let analysis = &mut config.analysis;
        if self.execute {
            analysis.use_execution_trace = true;
        }
        if self.no_textual {
            analysis.use_textual = false;
        }
        if self.no_frameworks {
            analysis.use_framework_matching = false;
        }
        if let Some(timeout) = self.timeout {
            analysis.execution_timeout_secs = timeout;
        }
        if let Some(jobs) = self.jobs {
            analysis.parallel = match jobs {
                0 => ParallelConfig::default(),
                1 => ParallelConfig::sequential(),
                n => ParallelConfig::with_workers(n),
            };
        }
        if let Some(python) = &self.python {
            analysis.interpreter = Some(python.clone());
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache statistics and location
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Remove cached entries; all of them unless tags are given
    Clear {
        /// Only remove entries carrying this tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_flags_override_config() {
        let cli = Cli::parse_from([
            "importscope",
            "analyze",
            "app.py",
            "--execute",
            "--no-textual",
            "--timeout",
            "5",
            "--jobs",
            "1",
            "--no-cache",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let mut config = ImportscopeConfig::default();
        args.apply_to(&mut config);

        assert!(config.analysis.use_execution_trace);
        assert!(!config.analysis.use_textual);
        assert_eq!(config.analysis.execution_timeout_secs, 5);
        assert!(!config.analysis.parallel.enabled);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_cache_clear_tags() {
        let cli = Cli::parse_from(["importscope", "cache", "clear", "--tag", "a", "--tag", "b"]);
        match cli.command {
            Commands::Cache {
                action: CacheCommand::Clear { tags },
            } => assert_eq!(tags, vec!["a", "b"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_envs_defaults_to_current_directory() {
        let cli = Cli::parse_from(["importscope", "envs", "--json"]);
        match cli.command {
            Commands::Envs { project, json } => {
                assert_eq!(project, PathBuf::from("."));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

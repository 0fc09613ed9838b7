use anyhow::{bail, Context, Result};
use clap::Parser;
use importscope::analyzer::DependencyAnalyzer;
use importscope::analyzers::CancellationToken;
use importscope::cache::default_cache;
use importscope::cli::{AnalyzeArgs, CacheCommand, Cli, Commands};
use importscope::config::{
    apply_env_overrides, load_config, parse_config, EnvironmentSnapshot, ImportscopeConfig,
};
use importscope::interpreter::discover_environments;
use importscope::observability::init_logging;
use importscope::progress::ProgressConfig;
use importscope::report::render_text;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args, cli.quiet, cli.verbosity > 0),
        Commands::Cache { action } => handle_cache(action),
        Commands::Envs { project, json } => handle_envs(&project, json),
    }
}

/// Config file (explicit or searched from `start`), then environment
fn resolve_config(explicit: Option<&Path>, start: &Path) -> Result<ImportscopeConfig> {
    let config = match explicit {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let mut config = parse_config(&contents)
                .with_context(|| format!("parsing config {}", path.display()))?;
            apply_env_overrides(&mut config, &EnvironmentSnapshot::from_current_env());
            config
        }
        None => load_config(start),
    };
    Ok(config)
}

fn search_start(scripts: &[PathBuf]) -> PathBuf {
    scripts
        .first()
        .and_then(|s| s.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn handle_analyze(args: &AnalyzeArgs, quiet: bool, verbose: bool) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref(), &search_start(&args.scripts))?;
    args.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    let mut analyzer = DependencyAnalyzer::new(config.analysis.clone())?;
    if config.cache.enabled {
        match default_cache(&config.cache) {
            Ok(cache) => analyzer = analyzer.with_cache(cache),
            Err(e) => log::warn!("Cache unavailable, continuing without it: {}", e),
        }
    }

    let progress = ProgressConfig::from_env(quiet || args.json || args.args)
        .batch_bar(args.scripts.len() as u64);
    let outcomes = analyzer.analyze_batch(&args.scripts, &CancellationToken::new(), &progress);

    let mut failures = 0;
    let mut results = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                failures += 1;
                eprintln!("importscope: {}: {}", path.display(), e);
            }
        }
    }

    if args.json {
        let json = match results.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        };
        println!("{}", json);
    } else if args.args {
        for result in &results {
            println!("{}", result.directives.to_cli_args().join(" "));
        }
    } else {
        for (i, result) in results.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print!("{}", render_text(result, verbose));
        }
    }

    if failures > 0 {
        bail!(
            "{} of {} scripts could not be analyzed",
            failures,
            args.scripts.len()
        );
    }
    Ok(())
}

fn handle_cache(action: CacheCommand) -> Result<()> {
    let config = resolve_config(None, Path::new("."))?;
    let cache = default_cache(&config.cache).context("opening cache")?;

    match action {
        CacheCommand::Stats { json } => {
            let stats = cache.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Location:      {}", cache.directory().display());
                println!(
                    "Memory tier:   {} entries, {} bytes",
                    stats.memory_entries, stats.memory_bytes
                );
                println!(
                    "Disk tier:     {} entries, {} bytes",
                    stats.disk_entries, stats.disk_bytes
                );
                println!(
                    "Lookups:       {} ({:.0}% hits)",
                    stats.lookups(),
                    stats.hit_rate() * 100.0
                );
                println!("Evictions:     {}", stats.evictions);
            }
        }
        CacheCommand::Clear { tags } => {
            let removed = if tags.is_empty() {
                cache.clear(None)
            } else {
                cache.clear(Some(tags.as_slice()))
            };
            println!("Removed {} cached entries", removed);
        }
    }
    Ok(())
}

fn handle_envs(project: &Path, json: bool) -> Result<()> {
    let environments = discover_environments(project);
    if json {
        println!("{}", serde_json::to_string_pretty(&environments)?);
        return Ok(());
    }
    if environments.is_empty() {
        println!("No Python environments found");
        return Ok(());
    }
    for env in &environments {
        println!("{:<7} {:<30} {}", env.kind, env.name, env.interpreter.display());
    }
    Ok(())
}

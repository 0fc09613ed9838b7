//! Human-readable rendering of an analysis result.

use crate::core::{AnalysisResult, ConfidenceTier, StrategyStatus};
use colored::{ColoredString, Colorize};
use std::fmt::Write;

fn tier_label(tier: ConfidenceTier) -> ColoredString {
    let label = tier.to_string();
    match tier {
        ConfidenceTier::Essential => label.green().bold(),
        ConfidenceTier::Recommended => label.cyan().bold(),
        ConfidenceTier::Optional => label.yellow(),
        ConfidenceTier::Risky => label.red(),
    }
}

fn status_label(status: &StrategyStatus) -> ColoredString {
    match status {
        StrategyStatus::Succeeded => "ok".green(),
        StrategyStatus::Skipped => "skipped".dimmed(),
        StrategyStatus::Degraded(reason) => format!("degraded: {}", reason).yellow(),
        StrategyStatus::Failed(reason) => format!("failed: {}", reason).red(),
        StrategyStatus::TimedOut => "timed out".red(),
        StrategyStatus::Cancelled => "cancelled".yellow(),
    }
}

/// Multi-line terminal report. `verbose` adds per-module scores and contexts.
pub fn render_text(result: &AnalysisResult, verbose: bool) -> String {
    let mut out = String::new();
    let source = if result.cache_hit { " (cached)" } else { "" };
    let _ = writeln!(
        out,
        "{} {}{}",
        "Script:".bold(),
        result.script.display(),
        source.dimmed()
    );
    let _ = writeln!(
        out,
        "{} modules in {} ms",
        result.modules.len(),
        result.elapsed_ms
    );

    if let Some(error) = &result.parse_error {
        let _ = writeln!(out, "{} {}", "Syntax error:".red().bold(), error);
    }

    for tier in [
        ConfidenceTier::Essential,
        ConfidenceTier::Recommended,
        ConfidenceTier::Optional,
        ConfidenceTier::Risky,
    ] {
        let names = result.tiers.get(tier);
        if names.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({})", tier_label(tier), names.len());
        for name in names {
            let Some(module) = result.modules.get(name) else {
                continue;
            };
            let mut flags = Vec::new();
            if module.local {
                flags.push("local");
            }
            if module.missing {
                flags.push("missing");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            if verbose {
                let contexts: Vec<&str> = module.contexts.iter().map(|c| c.as_str()).collect();
                let _ = writeln!(
                    out,
                    "  {:<24} {:.2}  {}{}",
                    name,
                    module.score,
                    contexts.join(",").dimmed(),
                    flags.red()
                );
            } else {
                let _ = writeln!(out, "  {}{}", name, flags.red());
            }
        }
    }

    if !result.frameworks.is_empty() {
        let _ = writeln!(
            out,
            "\n{} {}",
            "Frameworks:".bold(),
            result.frameworks.join(", ")
        );
    }

    let _ = writeln!(out, "\n{}", "Strategies:".bold());
    for report in &result.strategies {
        let _ = writeln!(
            out,
            "  {:<20} {} ({} findings, {} ms)",
            report.strategy.as_str(),
            status_label(&report.status),
            report.findings,
            report.elapsed_ms
        );
    }

    if !result.directives.is_empty() {
        let _ = writeln!(out, "\n{}", "Packaging arguments:".bold());
        let _ = writeln!(out, "  {}", result.directives.to_cli_args().join(" "));
    }

    if !result.recommendations.is_empty() {
        let _ = writeln!(out, "\n{}", "Recommendations:".bold());
        for recommendation in &result.recommendations {
            let _ = writeln!(out, "  - {}", recommendation);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{CancellationToken, SourceInput};
    use crate::config::AnalysisConfig;
    use crate::reconciler::Reconciler;

    fn analyze(source: &str) -> AnalysisResult {
        let config = AnalysisConfig {
            check_missing_modules: false,
            ..AnalysisConfig::default()
        };
        Reconciler::new(config).reconcile(
            &SourceInput::from_source("/nonexistent/app.py", source),
            &CancellationToken::new(),
        )
    }

    #[test]
    fn test_report_lists_modules_and_arguments() {
        let text = render_text(&analyze("import os\nimport requests\n"), false);
        assert!(text.contains("requests"));
        assert!(text.contains("--hidden-import"));
        assert!(text.contains("syntax-tree"));
    }

    #[test]
    fn test_verbose_report_shows_contexts() {
        let text = render_text(&analyze("import os\n"), true);
        assert!(text.contains("top-level-import"));
        assert!(text.contains("1.00"));
    }
}

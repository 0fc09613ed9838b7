//! Progress feedback for batch analysis.
//!
//! Bars are hidden in quiet mode (`--quiet` or `IMPORTSCOPE_QUIET`) and when
//! stderr is not a terminal, so piped output and CI logs stay clean.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

pub const TEMPLATE_BATCH: &str = "{spinner} {msg} {pos}/{len} scripts ({percent}%) - {eta}";

#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
}

impl ProgressConfig {
    pub fn from_env(quiet: bool) -> Self {
        Self {
            quiet_mode: quiet || std::env::var_os("IMPORTSCOPE_QUIET").is_some(),
        }
    }

    pub fn should_show_progress(&self) -> bool {
        !self.quiet_mode && std::io::stderr().is_terminal()
    }

    /// Bar over `len` scripts, hidden when progress should not be shown
    pub fn batch_bar(&self, len: u64) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE_BATCH)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode_hides_bar() {
        let config = ProgressConfig { quiet_mode: true };
        assert!(!config.should_show_progress());
        assert!(config.batch_bar(3).is_hidden());
    }
}

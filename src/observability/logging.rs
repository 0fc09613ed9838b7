//! Subscriber setup for `tracing` spans and `log` records.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Filter directives read from `IMPORTSCOPE_LOG`, then `RUST_LOG`
pub fn filter_directives(default_level: &str) -> String {
    std::env::var("IMPORTSCOPE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_level.to_string())
}

/// Install the global subscriber writing to stderr.
///
/// `log` records from the cache and config layers are bridged into the same
/// subscriber. Safe to call more than once; only the first call wins.
pub fn init_logging(verbosity: u8) {
    INIT.call_once(|| {
        let default_level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_new(filter_directives(default_level))
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();

        if let Err(e) = result {
            eprintln!("importscope: logging already initialized: {}", e);
        }
    });
}

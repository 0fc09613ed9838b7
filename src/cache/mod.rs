//! Memory + disk cache for analysis results.

pub mod atomic_io;
pub mod disk_tier;
pub mod entry;
pub mod key;
pub mod layered;
pub mod memory_tier;
pub mod sweeper;

pub use entry::EntryMetadata;
pub use key::{content_hash, CacheKey};
pub use layered::{CacheStats, LayeredCache};

use crate::config::CacheConfig;
use crate::errors::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static DEFAULT_CACHE: OnceCell<Arc<LayeredCache>> = OnceCell::new();

/// Process-wide cache for the command-line front end. The first call's
/// configuration wins; library callers should construct their own
/// [`LayeredCache`] and pass it in.
pub fn default_cache(config: &CacheConfig) -> Result<Arc<LayeredCache>> {
    DEFAULT_CACHE
        .get_or_try_init(|| LayeredCache::open(config).map(Arc::new))
        .map(Arc::clone)
}

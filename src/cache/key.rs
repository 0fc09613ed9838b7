use crate::config::AnalysisConfig;
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex sha256 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Key of a cached analysis.
///
/// Derived from the script content and the output-relevant configuration
/// only, so moving or touching a file does not invalidate its entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn for_source(source: &[u8], config: &AnalysisConfig) -> Self {
        Self::for_content_hash(&content_hash(source), config)
    }

    pub fn for_content_hash(content_hash: &str, config: &AnalysisConfig) -> Self {
        let config_hash = self::content_hash(config.fingerprint().as_bytes());
        Self(format!(
            "analysis/{}/{}/{}",
            env!("CARGO_PKG_VERSION"),
            content_hash,
            config_hash
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

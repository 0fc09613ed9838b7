use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

/// Bookkeeping for one cached value, shared by both tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub created_at: SystemTime,
    pub last_accessed: SystemTime,
    pub access_count: u64,
    pub ttl: Duration,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub size_bytes: u64,
}

impl EntryMetadata {
    pub fn new(size_bytes: u64, ttl: Duration, tags: &[String]) -> Self {
        let now = SystemTime::now();
        Self {
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl,
            tags: tags.iter().cloned().collect(),
            size_bytes,
        }
    }

    /// A clock that moved backwards never expires an entry early
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now.duration_since(self.created_at)
            .map(|age| age >= self.ttl)
            .unwrap_or(false)
    }

    pub fn touch(&mut self, now: SystemTime) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// True when `tags` is `None` or shares at least one tag
    pub fn matches_tags(&self, tags: Option<&[String]>) -> bool {
        match tags {
            None => true,
            Some(wanted) => wanted.iter().any(|t| self.tags.contains(t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let meta = EntryMetadata::new(10, Duration::from_secs(60), &[]);
        assert!(!meta.is_expired(meta.created_at + Duration::from_secs(59)));
        assert!(meta.is_expired(meta.created_at + Duration::from_secs(60)));
        assert!(!meta.is_expired(meta.created_at - Duration::from_secs(5)));
    }

    #[test]
    fn test_tag_matching() {
        let meta = EntryMetadata::new(1, Duration::from_secs(1), &["analysis".to_string()]);
        assert!(meta.matches_tags(None));
        assert!(meta.matches_tags(Some(&["analysis".to_string(), "x".to_string()])));
        assert!(!meta.matches_tags(Some(&["other".to_string()])));
        assert!(!meta.matches_tags(Some(&[])));
    }
}

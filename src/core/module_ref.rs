use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A dotted module name such as `a.b.c`.
///
/// Packaging decisions only care about the top-level package, so equality,
/// hashing and ordering all go through [`ModuleRef::top_level`]. The full
/// dotted path is kept for display and diagnostics.
#[derive(Debug, Clone)]
pub struct ModuleRef {
    dotted: String,
    top_len: usize,
}

impl ModuleRef {
    /// Parse a dotted name, rejecting empty and relative names.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || name.starts_with('.') {
            return None;
        }
        let valid = name.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_')
                && !part.starts_with(|c: char| c.is_ascii_digit())
        });
        if !valid {
            return None;
        }
        let top_len = name.find('.').unwrap_or(name.len());
        Some(Self {
            dotted: name.to_string(),
            top_len,
        })
    }

    /// Top-level package component (`a` for `a.b.c`)
    pub fn top_level(&self) -> &str {
        &self.dotted[..self.top_len]
    }

    /// Full dotted name as written at the reference site
    pub fn dotted(&self) -> &str {
        &self.dotted
    }

    /// Reference reduced to its top-level component
    pub fn to_top_level(&self) -> Self {
        Self {
            dotted: self.top_level().to_string(),
            top_len: self.top_len,
        }
    }

    pub fn is_private(&self) -> bool {
        self.top_level().starts_with('_')
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.top_level() == other.top_level()
    }
}

impl Eq for ModuleRef {}

impl Hash for ModuleRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.top_level().hash(state);
    }
}

impl PartialOrd for ModuleRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.top_level().cmp(other.top_level())
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.top_level())
    }
}

impl Serialize for ModuleRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.dotted)
    }
}

impl<'de> Deserialize<'de> for ModuleRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ModuleRef::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid module name: {raw:?}")))
    }
}

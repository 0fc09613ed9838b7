//! Static packaging knowledge about popular Python frameworks.

mod profiles;

use crate::core::ModuleRef;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Packaging requirements of one framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkProfile {
    pub name: &'static str,
    /// Distribution name for installation hints
    pub package: &'static str,
    /// Top-level modules whose presence identifies the framework
    pub indicators: &'static [&'static str],
    pub hidden_imports: &'static [&'static str],
    pub collect_all: &'static [&'static str],
    /// Paths relative to the script directory, glob syntax allowed
    pub data_files: &'static [&'static str],
    /// Packages the framework loads on its own behalf
    pub companions: &'static [&'static str],
    pub notes: &'static [&'static str],
}

impl FrameworkProfile {
    pub fn matches(&self, top_level: &str) -> bool {
        self.indicators.contains(&top_level)
    }
}

/// Top-level modules that cannot be bundled together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownConflict {
    pub modules: &'static [&'static str],
    pub reason: &'static str,
}

/// A known conflict present in one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictMatch {
    /// The conflicting modules that were actually detected, in table order
    pub modules: Vec<&'static str>,
    pub reason: &'static str,
}

/// Read-only table of framework profiles
#[derive(Debug)]
pub struct FrameworkKnowledgeBase {
    profiles: &'static [FrameworkProfile],
    conflicts: &'static [KnownConflict],
    by_name: HashMap<&'static str, usize>,
}

static BUILTIN: Lazy<FrameworkKnowledgeBase> = Lazy::new(|| {
    FrameworkKnowledgeBase::from_tables(profiles::BUILTIN_PROFILES, profiles::KNOWN_CONFLICTS)
});

impl FrameworkKnowledgeBase {
    fn from_tables(
        profiles: &'static [FrameworkProfile],
        conflicts: &'static [KnownConflict],
    ) -> Self {
        let by_name = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name, i))
            .collect();
        Self {
            profiles,
            conflicts,
            by_name,
        }
    }

    pub fn builtin() -> &'static FrameworkKnowledgeBase {
        &BUILTIN
    }

    pub fn profiles(&self) -> &'static [FrameworkProfile] {
        self.profiles
    }

    /// Every profile with an indicator among `modules`, in table order
    pub fn lookup(&self, modules: &BTreeSet<ModuleRef>) -> Vec<&'static FrameworkProfile> {
        let present: BTreeSet<&str> = modules.iter().map(ModuleRef::top_level).collect();
        self.profiles
            .iter()
            .filter(|p| p.indicators.iter().any(|i| present.contains(i)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&'static FrameworkProfile> {
        self.by_name.get(name).map(|&i| &self.profiles[i])
    }

    /// Known conflicts with at least two members among `modules`
    pub fn conflicts(&self, modules: &BTreeSet<&str>) -> Vec<ConflictMatch> {
        self.conflicts
            .iter()
            .filter_map(|conflict| {
                let present: Vec<&'static str> = conflict
                    .modules
                    .iter()
                    .copied()
                    .filter(|m| modules.contains(m))
                    .collect();
                (present.len() > 1).then_some(ConflictMatch {
                    modules: present,
                    reason: conflict.reason,
                })
            })
            .collect()
    }

    /// Distribution to install for a top-level module, when it differs
    /// from the module name
    pub fn package_for_module(&self, top_level: &str) -> Option<&'static str> {
        self.profiles
            .iter()
            .find(|p| p.matches(top_level))
            .map(|p| p.package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules(names: &[&str]) -> BTreeSet<ModuleRef> {
        names.iter().filter_map(|n| ModuleRef::parse(n)).collect()
    }

    #[test]
    fn test_lookup_by_top_level_in_table_order() {
        let kb = FrameworkKnowledgeBase::builtin();
        let found: Vec<_> = kb
            .lookup(&modules(&["requests.adapters", "flask", "os"]))
            .iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(found, vec!["flask", "requests"]);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let kb = FrameworkKnowledgeBase::builtin();
        assert!(kb.lookup(&modules(&["pyqt5", "Django"])).is_empty());
        assert_eq!(kb.lookup(&modules(&["PyQt5.QtWidgets"]))[0].name, "PyQt5");
    }

    #[test]
    fn test_get_and_package_names() {
        let kb = FrameworkKnowledgeBase::builtin();
        assert_eq!(kb.get("opencv").map(|p| p.package), Some("opencv-python"));
        assert_eq!(kb.package_for_module("sklearn"), Some("scikit-learn"));
        assert_eq!(kb.package_for_module("leftpad"), None);
        assert!(kb.get("nonexistent").is_none());
    }

    #[test]
    fn test_table_is_consistent() {
        let kb = FrameworkKnowledgeBase::builtin();
        assert_eq!(kb.profiles().len(), 19);
        for profile in kb.profiles() {
            assert!(!profile.indicators.is_empty(), "{}", profile.name);
            for indicator in profile.indicators {
                assert!(ModuleRef::parse(indicator).is_some(), "{indicator}");
            }
            for companion in profile.companions {
                assert!(ModuleRef::parse(companion).is_some(), "{companion}");
            }
        }
    }

    #[test]
    fn test_conflicts_need_two_members() {
        let kb = FrameworkKnowledgeBase::builtin();
        assert!(kb.conflicts(&BTreeSet::from(["PyQt5", "numpy"])).is_empty());

        let found = kb.conflicts(&BTreeSet::from(["PySide6", "PyQt5", "PyQt6", "os"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].modules, vec!["PyQt5", "PyQt6", "PySide6"]);
        assert!(found[0].reason.contains("Qt binding"));

        let pil = kb.conflicts(&BTreeSet::from(["Image", "PIL"]));
        assert_eq!(pil[0].modules, vec!["PIL", "Image"]);
    }
}

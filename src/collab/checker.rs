//! Registry of known capabilities with token-overlap similarity.

use std::collections::{BTreeSet, HashSet};
use std::sync::RwLock;

use crate::collab::CapabilityChecker;
use crate::model::SimilarCapability;

/// Capabilities every fresh registry knows about.
const BUILTINS: &[&str] = &[
    "monitor_server",
    "analyze_data",
    "fetch_web",
    "scan_security",
    "create_report",
];

/// In-memory capability registry.
#[derive(Debug, Default)]
pub struct RegistryChecker {
    names: RwLock<BTreeSet<String>>,
}

impl RegistryChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let checker = Self::new();
        for name in BUILTINS {
            checker.register(name);
        }
        checker
    }

    pub fn register(&self, name: &str) {
        if let Ok(mut names) = self.names.write() {
            names.insert(name.to_string());
        }
    }

    pub fn capability_count(&self) -> usize {
        self.names.read().map(|n| n.len()).unwrap_or(0)
    }
}

/// Jaccard overlap of the `_`-separated tokens of two names.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split('_').filter(|t| !t.is_empty()).collect();
    let tb: HashSet<&str> = b.split('_').filter(|t| !t.is_empty()).collect();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    ta.intersection(&tb).count() as f64 / union as f64
}

impl CapabilityChecker for RegistryChecker {
    fn check_exists(&self, name: &str) -> bool {
        self.names.read().map(|n| n.contains(name)).unwrap_or(false)
    }

    fn find_similar(&self, name: &str, top_k: usize) -> Vec<SimilarCapability> {
        let Ok(names) = self.names.read() else {
            return Vec::new();
        };
        let mut scored: Vec<SimilarCapability> = names
            .iter()
            .map(|known| SimilarCapability {
                name: known.clone(),
                similarity_score: similarity(name, known),
            })
            .filter(|s| s.similarity_score > 0.0)
            .collect();
        // BTreeSet iteration is name-ordered, so a stable sort keeps ties by name.
        scored.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        scored.truncate(top_k);
        scored
    }
}

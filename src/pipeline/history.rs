//! # Stage: BuildHistory / LearningTable
//!
//! ## Responsibility
//! Audit trail of every result the orchestrator returns, and a per-capability
//! aggregate answering "how often has capability X built successfully".
//!
//! ## Guarantees
//! - Append-only: history entries are never removed or reordered.
//! - The learning table only changes through [`LearningTable::record`], which
//!   the orchestrator calls for fresh (non-cache-hit) runs only.
//! - Non-panicking: all division is guarded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::BuildResult;

// ---------------------------------------------------------------------------
// BuildHistory
// ---------------------------------------------------------------------------

/// Every returned result, in call order.
#[derive(Debug, Default)]
pub struct BuildHistory {
    entries: Vec<BuildResult>,
}

impl BuildHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one returned result.
    pub fn append(&mut self, result: BuildResult) {
        self.entries.push(result);
    }

    /// All results, oldest first.
    pub fn entries(&self) -> &[BuildResult] {
        &self.entries
    }

    /// Number of results recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that ran the pipeline (cache hits excluded).
    pub fn fresh_count(&self) -> usize {
        self.entries.iter().filter(|r| !r.cached).count()
    }

    /// Entries served from the cache.
    pub fn cache_hit_count(&self) -> usize {
        self.entries.iter().filter(|r| r.cached).count()
    }

    /// All entries for one capability, oldest first.
    pub fn for_capability<'a>(&'a self, capability_name: &'a str) -> impl Iterator<Item = &'a BuildResult> + 'a {
        self.entries.iter().filter(move |r| r.capability_name == capability_name)
    }

    /// The most recent result.
    pub fn last(&self) -> Option<&BuildResult> {
        self.entries.last()
    }
}

// ---------------------------------------------------------------------------
// LearningRecord / LearningTable
// ---------------------------------------------------------------------------

/// Rolling statistics for one capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    /// Fresh runs, successful or not.
    pub attempts: u32,
    /// Fresh runs that ended `Active`.
    pub successes: u32,
    /// Build time of the latest fresh run.
    pub last_build_time_ms: f64,
    /// `tests_passed / max(tests_total, 1)` of the latest attempt.
    pub last_test_ratio: f64,
}

impl LearningRecord {
    /// `successes / attempts`, or 0 when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

/// Capability name → rolling build statistics.
#[derive(Debug, Default)]
pub struct LearningTable {
    records: HashMap<String, LearningRecord>,
}

impl LearningTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fresh result into the record for its capability.
    pub fn record(&mut self, result: &BuildResult) {
        let rec = self.records.entry(result.capability_name.clone()).or_default();
        rec.attempts += 1;
        if result.is_active() {
            rec.successes += 1;
        }
        rec.last_build_time_ms = result.build_time_ms;
        rec.last_test_ratio = result.test_ratio();
    }

    /// Record for `capability_name`.
    pub fn get(&self, capability_name: &str) -> Option<&LearningRecord> {
        self.records.get(capability_name)
    }

    pub fn success_rate(&self, capability_name: &str) -> Option<f64> {
        self.get(capability_name).map(LearningRecord::success_rate)
    }

    /// Number of results recorded.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

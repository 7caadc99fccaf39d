//! # Stage: RequestCache
//!
//! ## Responsibility
//! Map a request fingerprint to the last successful build for that
//! fingerprint, so identical requests skip the pipeline entirely.
//!
//! ## Guarantees
//! - Success-only: `put` refuses any result whose status is not `Active`.
//! - At most one cached success per fingerprint; a later success replaces it.
//! - Hits are returned as copies with `cached = true`; the stored entry is
//!   never mutated.
//! - Entries live until [`RequestCache::evict_capability`] removes them.
//!
//! ## NOT Responsible For
//! - Fuzzy or semantic matching (exact fingerprint equality only)
//! - TTL or size-bounded eviction

use std::collections::HashMap;

use crate::model::BuildResult;

/// A single cached success.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: BuildResult,
    inserted_ms: u64,
    hit_count: u32,
}

/// Fingerprint-keyed cache of successful builds.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: HashMap<String, CacheEntry>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a `cached = true` copy of the stored success, if any.
    pub fn get(&mut self, fingerprint: &str) -> Option<BuildResult> {
        let entry = self.entries.get_mut(fingerprint)?;
        entry.hit_count = entry.hit_count.saturating_add(1);
        Some(entry.result.as_cached())
    }

    /// Store `result` under `fingerprint`.  Returns `false` and stores nothing
    /// when the result is not `Active`.
    pub fn put(&mut self, fingerprint: impl Into<String>, result: BuildResult) -> bool {
        if !result.is_active() {
            return false;
        }
        self.entries.insert(
            fingerprint.into(),
            CacheEntry { result, inserted_ms: crate::model::now_ms(), hit_count: 0 },
        );
        true
    }

    /// Remove every entry whose result belongs to `capability_name`.
    /// Returns how many entries were removed.
    pub fn evict_capability(&mut self, capability_name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.result.capability_name != capability_name);
        before - self.entries.len()
    }

    /// Number of times the entry for `fingerprint` has been served.
    pub fn hit_count(&self, fingerprint: &str) -> Option<u32> {
        self.entries.get(fingerprint).map(|e| e.hit_count)
    }

    /// Unix-ms timestamp at which the entry for `fingerprint` was stored.
    pub fn inserted_at(&self, fingerprint: &str) -> Option<u64> {
        self.entries.get(fingerprint).map(|e| e.inserted_ms)
    }

    /// `true` when `fingerprint` has a cached success.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Number of cached successes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

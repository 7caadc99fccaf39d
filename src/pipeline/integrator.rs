//! # Stage: LiveIntegrator
//!
//! ## Responsibility
//! Hot-deploys generated modules into a live registry and undoes those
//! deployments.  Owns four pieces of state: the module registry, the routing
//! table, the master capability registry, and a LIFO stack of compensating
//! rollback entries.
//!
//! Two undo paths exist:
//! - [`LiveIntegrator::rollback`] pops the stack, newest first.
//! - [`LiveIntegrator::rollback_capability`] removes everything belonging to
//!   one capability regardless of stack position, then purges the stack of
//!   entries that touched what it removed.
//!
//! ## Guarantees
//! - Every `hot_load` pushes exactly one entry (`Add` or `Update`).
//! - `update_routing` pushes a `RouteChange` only when a route already existed;
//!   a capability's first route is not on the stack.
//! - `register_with_master` never touches the stack.
//! - Non-panicking: rollback on an empty stack or an unknown capability is a
//!   no-op reported through the return value.
//!
//! ## NOT Responsible For
//! - Deciding whether a module should be deployed (the orchestrator's testing
//!   phase does that)
//! - Persisting the registry across process restarts

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{now_ms, CodeType, GeneratedModule};

// ---------------------------------------------------------------------------
// ModuleRecord
// ---------------------------------------------------------------------------

/// Load state of a record held by the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// First definition under this name.
    Loaded,
    /// Replaced an earlier definition.
    Reloaded,
}

/// The live definition of one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Unique registry key.
    pub module_name: String,
    /// Client, agent, model or test.
    pub code_type: CodeType,
    /// Size of the generated module.
    pub line_count: usize,
    /// Declared dependencies, in order.
    pub dependencies: Vec<String>,
    /// Whether this record replaced an earlier definition.
    pub status: LoadState,
    /// Wall-clock time of the load, in milliseconds since the epoch.
    pub loaded_at_ms: u64,
    /// Capability that deployed this module, when known.
    pub capability: Option<String>,
}

/// Result of [`LiveIntegrator::get_status`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleStatus {
    Loaded(ModuleRecord),
    NotLoaded,
}

impl ModuleStatus {
    /// The record, when loaded.
    pub fn record(&self) -> Option<&ModuleRecord> {
        match self {
            ModuleStatus::Loaded(rec) => Some(rec),
            ModuleStatus::NotLoaded => None,
        }
    }

    /// `true` for `Loaded`.
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModuleStatus::Loaded(_))
    }
}

// ---------------------------------------------------------------------------
// RollbackEntry
// ---------------------------------------------------------------------------

/// The compensating action recorded for one mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackAction {
    /// Undo by deleting the module.
    Add { module_name: String },
    /// Undo by restoring the full prior record.
    Update { module_name: String, previous: ModuleRecord },
    /// Undo by restoring the prior route.
    RouteChange { capability_name: String, previous_route: String },
}

/// One entry on the rollback stack.
#[derive(Debug, Clone, PartialEq)]
pub struct RollbackEntry {
    /// What undoing this entry does.
    pub action: RollbackAction,
    /// Capability the mutation was made on behalf of, when known.
    pub capability: Option<String>,
    /// When the mutation was made.
    pub timestamp_ms: u64,
}

impl RollbackEntry {
    fn touches_module(&self, names: &HashSet<String>) -> bool {
        match &self.action {
            RollbackAction::Add { module_name } | RollbackAction::Update { module_name, .. } => {
                names.contains(module_name)
            }
            RollbackAction::RouteChange { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// MasterEntry
// ---------------------------------------------------------------------------

/// A capability registered with the master registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterEntry {
    /// Free-form handler metadata, e.g. the parsed intent.
    pub handler_info: BTreeMap<String, String>,
    /// Time of the latest registration.
    pub registered_at_ms: u64,
    /// `false` once the capability has been rolled back.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// LiveIntegrator
// ---------------------------------------------------------------------------

/// Live module registry with LIFO rollback.
///
/// # Example
/// ```rust
/// use hotforge::model::{CodeType, GeneratedModule};
/// use hotforge::pipeline::integrator::LiveIntegrator;
///
/// let mut li = LiveIntegrator::new();
/// li.hot_load(&GeneratedModule::new("weather_client", CodeType::Client, 10));
/// li.hot_load(&GeneratedModule::new("weather_client", CodeType::Client, 20));
/// assert_eq!(li.rollback(1), 1);
/// assert_eq!(li.get_status("weather_client").record().unwrap().line_count, 10);
/// ```
#[derive(Debug, Default)]
pub struct LiveIntegrator {
    modules: HashMap<String, ModuleRecord>,
    routes: HashMap<String, String>,
    master: HashMap<String, MasterEntry>,
    stack: Vec<RollbackEntry>,
}

impl LiveIntegrator {
    /// Construct an empty integrator.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Upsert `module` with no capability tag.  Always succeeds.
    pub fn hot_load(&mut self, module: &GeneratedModule) -> bool {
        self.load(module, None)
    }

    /// Upsert `module` on behalf of `capability_name`.  Always succeeds.
    pub fn hot_load_for(&mut self, capability_name: &str, module: &GeneratedModule) -> bool {
        self.load(module, Some(capability_name.to_string()))
    }

    fn load(&mut self, module: &GeneratedModule, capability: Option<String>) -> bool {
        let now = now_ms();
        let previous = self.modules.get(&module.module_name).cloned();
        let status = if previous.is_some() { LoadState::Reloaded } else { LoadState::Loaded };

        let action = match previous {
            Some(previous) => RollbackAction::Update {
                module_name: module.module_name.clone(),
                previous,
            },
            None => RollbackAction::Add { module_name: module.module_name.clone() },
        };
        self.stack.push(RollbackEntry { action, capability: capability.clone(), timestamp_ms: now });

        self.modules.insert(
            module.module_name.clone(),
            ModuleRecord {
                module_name: module.module_name.clone(),
                code_type: module.code_type,
                line_count: module.line_count,
                dependencies: module.dependencies.clone(),
                status,
                loaded_at_ms: now,
                capability,
            },
        );

        tracing::debug!(
            target: "hotforge::integrator",
            module = %module.module_name,
            ?status,
            depth = self.stack.len(),
            "module hot-loaded"
        );
        true
    }

    /// Upsert the master registry entry for `capability_name`, marking it
    /// active.  Not recorded on the rollback stack.
    pub fn register_with_master(
        &mut self,
        capability_name: &str,
        handler_info: BTreeMap<String, String>,
    ) -> bool {
        self.master.insert(
            capability_name.to_string(),
            MasterEntry { handler_info, registered_at_ms: now_ms(), active: true },
        );
        true
    }

    /// Point `capability_name` at `route`.  Only a replacement of an existing
    /// route is undoable through [`rollback`](Self::rollback).
    pub fn update_routing(&mut self, capability_name: &str, route: &str) -> bool {
        if let Some(previous_route) = self.routes.get(capability_name) {
            self.stack.push(RollbackEntry {
                action: RollbackAction::RouteChange {
                    capability_name: capability_name.to_string(),
                    previous_route: previous_route.clone(),
                },
                capability: Some(capability_name.to_string()),
                timestamp_ms: now_ms(),
            });
        }
        self.routes.insert(capability_name.to_string(), route.to_string());
        tracing::debug!(
            target: "hotforge::integrator",
            capability = %capability_name,
            route = %route,
            "route updated"
        );
        true
    }

    /// Undo up to `steps` stack entries, newest first.  Returns how many were
    /// undone (0 on an empty stack).
    pub fn rollback(&mut self, steps: usize) -> usize {
        let mut undone = 0;
        while undone < steps {
            let Some(entry) = self.stack.pop() else { break };
            match entry.action {
                RollbackAction::Add { module_name } => {
                    self.modules.remove(&module_name);
                }
                RollbackAction::Update { module_name, previous } => {
                    self.modules.insert(module_name, previous);
                }
                RollbackAction::RouteChange { capability_name, previous_route } => {
                    self.routes.insert(capability_name, previous_route);
                }
            }
            undone += 1;
        }
        tracing::debug!(
            target: "hotforge::integrator",
            requested = steps,
            undone,
            remaining = self.stack.len(),
            "stack rollback"
        );
        undone
    }

    /// Remove everything belonging to `capability_name`:
    /// - modules tagged with exactly this capability, and untagged modules
    ///   whose name contains it;
    /// - its routing entry;
    /// - its master registration (flipped to inactive, not deleted).
    ///
    /// Stack entries that touched a removed module or were made for this
    /// capability are discarded.  A surviving `Update` whose previous record
    /// belongs to this capability becomes an `Add`, so undoing it deletes the
    /// module instead of restoring the rolled-back definition.  A later
    /// `rollback(n)` therefore cannot resurrect anything removed here.
    /// Returns `true` iff anything was removed or deactivated.
    pub fn rollback_capability(&mut self, capability_name: &str) -> bool {
        let removed: HashSet<String> = self
            .modules
            .values()
            .filter(|rec| belongs_to(rec, capability_name))
            .map(|rec| rec.module_name.clone())
            .collect();
        for name in &removed {
            self.modules.remove(name);
        }

        let route_removed = self.routes.remove(capability_name).is_some();

        let mut deactivated = false;
        if let Some(entry) = self.master.get_mut(capability_name) {
            deactivated = entry.active;
            entry.active = false;
        }

        let before = self.stack.len();
        self.stack.retain(|e| {
            !(e.touches_module(&removed) || e.capability.as_deref() == Some(capability_name))
        });
        let purged = before - self.stack.len();

        // A surviving reload must not restore this capability's definition.
        let mut rewritten = 0;
        for entry in &mut self.stack {
            let reloaded = match &entry.action {
                RollbackAction::Update { module_name, previous }
                    if belongs_to(previous, capability_name) =>
                {
                    Some(module_name.clone())
                }
                _ => None,
            };
            if let Some(module_name) = reloaded {
                entry.action = RollbackAction::Add { module_name };
                rewritten += 1;
            }
        }

        let changed = !removed.is_empty() || route_removed || deactivated;
        tracing::info!(
            target: "hotforge::integrator",
            capability = %capability_name,
            modules_removed = removed.len(),
            route_removed,
            deactivated,
            entries_purged = purged,
            entries_rewritten = rewritten,
            changed,
            "capability rollback"
        );
        changed
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    /// Load status of `module_name`; `NotLoaded` when unknown.
    pub fn get_status(&self, module_name: &str) -> ModuleStatus {
        match self.modules.get(module_name) {
            Some(rec) => ModuleStatus::Loaded(rec.clone()),
            None => ModuleStatus::NotLoaded,
        }
    }

    /// `true` when `module_name` is live.
    pub fn is_loaded(&self, module_name: &str) -> bool {
        self.modules.contains_key(module_name)
    }

    /// Number of live modules.
    pub fn loaded_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of entries on the rollback stack.
    pub fn rollback_depth(&self) -> usize {
        self.stack.len()
    }

    /// Stack entries, oldest first.
    pub fn rollback_entries(&self) -> &[RollbackEntry] {
        &self.stack
    }

    /// Capability to route, for every routed capability.
    pub fn routing_table(&self) -> &HashMap<String, String> {
        &self.routes
    }

    /// Current route of `capability_name`.
    pub fn route(&self, capability_name: &str) -> Option<&str> {
        self.routes.get(capability_name).map(String::as_str)
    }

    /// Master registration of `capability_name`, active or not.
    pub fn master_entry(&self, capability_name: &str) -> Option<&MasterEntry> {
        self.master.get(capability_name)
    }

    /// Names of every capability ever registered, sorted.
    pub fn registered_capabilities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.master.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of loaded modules belonging to `capability_name`, sorted.
    pub fn modules_for(&self, capability_name: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .modules
            .values()
            .filter(|rec| belongs_to(rec, capability_name))
            .map(|rec| rec.module_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

fn belongs_to(rec: &ModuleRecord, capability_name: &str) -> bool {
    match rec.capability.as_deref() {
        Some(tag) => tag == capability_name,
        None => rec.module_name.contains(capability_name),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn module(name: &str, lines: usize) -> GeneratedModule {
        GeneratedModule::new(name, CodeType::Client, lines)
    }

    // -------------------------------------------------------------------
    // hot_load
    // -------------------------------------------------------------------

    #[test]
    fn test_hot_load_registers_module() {
        let mut li = LiveIntegrator::new();
        assert!(li.hot_load(&module("test_mod", 1)));
        assert!(li.is_loaded("test_mod"));
        assert_eq!(li.loaded_count(), 1);
        assert_eq!(li.get_status("test_mod").record().unwrap().status, LoadState::Loaded);
    }

    #[test]
    fn test_hot_load_same_name_pushes_update_entry() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("mod1", 10));
        li.hot_load(&module("mod1", 20));
        assert_eq!(li.loaded_count(), 1);
        assert_eq!(li.rollback_depth(), 2);
        assert!(matches!(
            &li.rollback_entries()[1].action,
            RollbackAction::Update { previous, .. } if previous.line_count == 10
        ));
        assert_eq!(li.get_status("mod1").record().unwrap().status, LoadState::Reloaded);
    }

    #[test]
    fn test_hot_load_identical_content_still_grows_stack() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("m", 5));
        li.hot_load(&module("m", 5));
        li.hot_load(&module("m", 5));
        assert_eq!(li.rollback_depth(), 3);
        assert_eq!(li.loaded_count(), 1);
    }

    #[test]
    fn test_hot_load_for_tags_module_and_entry() {
        let mut li = LiveIntegrator::new();
        li.hot_load_for("send_telegram", &module("telegram_client", 3));
        let rec = li.get_status("telegram_client").record().cloned().unwrap();
        assert_eq!(rec.capability.as_deref(), Some("send_telegram"));
        assert_eq!(li.rollback_entries()[0].capability.as_deref(), Some("send_telegram"));
    }

    // -------------------------------------------------------------------
    // register_with_master / update_routing
    // -------------------------------------------------------------------

    #[test]
    fn test_register_with_master_does_not_push_entry() {
        let mut li = LiveIntegrator::new();
        let info = BTreeMap::from([("type".to_string(), "agent".to_string())]);
        assert!(li.register_with_master("weather", info));
        assert_eq!(li.registered_capabilities(), vec!["weather"]);
        assert!(li.master_entry("weather").unwrap().active);
        assert_eq!(li.rollback_depth(), 0);
    }

    #[test]
    fn test_first_route_is_not_undoable() {
        let mut li = LiveIntegrator::new();
        li.update_routing("weather", "weather_agent");
        assert_eq!(li.route("weather"), Some("weather_agent"));
        assert_eq!(li.rollback_depth(), 0);
        assert_eq!(li.rollback(1), 0);
        assert_eq!(li.route("weather"), Some("weather_agent"));
    }

    #[test]
    fn test_route_replacement_is_undoable() {
        let mut li = LiveIntegrator::new();
        li.update_routing("weather", "v1");
        li.update_routing("weather", "v2");
        assert_eq!(li.rollback_depth(), 1);
        assert_eq!(li.rollback(1), 1);
        assert_eq!(li.route("weather"), Some("v1"));
    }

    #[test]
    fn test_routing_table_holds_all_capabilities() {
        let mut li = LiveIntegrator::new();
        li.update_routing("a", "handler_a");
        li.update_routing("b", "handler_b");
        assert_eq!(li.routing_table().len(), 2);
    }

    // -------------------------------------------------------------------
    // rollback(n)
    // -------------------------------------------------------------------

    #[test]
    fn test_rollback_add_removes_module() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("mod1", 1));
        assert_eq!(li.rollback(1), 1);
        assert_eq!(li.loaded_count(), 0);
    }

    #[test]
    fn test_rollback_update_restores_previous_record() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("A", 10));
        li.hot_load(&module("A", 20));
        li.rollback(1);
        assert_eq!(li.get_status("A").record().unwrap().line_count, 10);
        assert_eq!(li.get_status("A").record().unwrap().status, LoadState::Loaded);
    }

    #[test]
    fn test_rollback_is_lifo_across_kinds() {
        let mut li = LiveIntegrator::new();
        li.update_routing("cap", "r1");
        li.hot_load(&module("x", 1));
        li.update_routing("cap", "r2");
        li.hot_load(&module("x", 2));
        assert_eq!(li.rollback(1), 1);
        assert_eq!(li.get_status("x").record().unwrap().line_count, 1);
        assert_eq!(li.route("cap"), Some("r2"));
        assert_eq!(li.rollback(1), 1);
        assert_eq!(li.route("cap"), Some("r1"));
        assert_eq!(li.rollback(1), 1);
        assert!(!li.is_loaded("x"));
    }

    #[test]
    fn test_rollback_empty_returns_zero() {
        let mut li = LiveIntegrator::new();
        assert_eq!(li.rollback(1), 0);
        assert_eq!(li.rollback(0), 0);
    }

    #[test]
    fn test_rollback_saturates_at_stack_size() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("a", 1));
        li.hot_load(&module("b", 1));
        assert_eq!(li.rollback(5), 2);
        assert_eq!(li.rollback_depth(), 0);
        assert_eq!(li.loaded_count(), 0);
    }

    // -------------------------------------------------------------------
    // rollback_capability
    // -------------------------------------------------------------------

    #[test]
    fn test_rollback_capability_scope() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("weather_client", 1));
        li.hot_load(&module("weather_agent", 1));
        li.hot_load(&module("billing_client", 1));
        li.update_routing("weather", "h");
        li.register_with_master("weather", BTreeMap::new());

        assert!(li.rollback_capability("weather"));
        assert!(!li.is_loaded("weather_client"));
        assert!(!li.is_loaded("weather_agent"));
        assert!(li.is_loaded("billing_client"));
        assert!(li.route("weather").is_none());
        assert!(!li.master_entry("weather").unwrap().active);
    }

    #[test]
    fn test_rollback_capability_not_found() {
        let mut li = LiveIntegrator::new();
        assert!(!li.rollback_capability("nonexistent"));
    }

    #[test]
    fn test_rollback_capability_twice_second_is_noop() {
        let mut li = LiveIntegrator::new();
        li.register_with_master("cap", BTreeMap::new());
        assert!(li.rollback_capability("cap"));
        assert!(!li.rollback_capability("cap"));
    }

    #[test]
    fn test_rollback_capability_uses_exact_tag_for_tagged_modules() {
        let mut li = LiveIntegrator::new();
        li.hot_load_for("send_telegram", &module("telegram_client", 1));
        li.hot_load_for("send_telegram_daily", &module("send_telegram_daily_agent", 1));
        assert!(li.rollback_capability("send_telegram"));
        assert!(!li.is_loaded("telegram_client"));
        assert!(li.is_loaded("send_telegram_daily_agent"));
        assert_eq!(li.modules_for("send_telegram_daily"), vec!["send_telegram_daily_agent"]);
    }

    #[test]
    fn test_rollback_capability_purges_stack_so_rollback_cannot_resurrect() {
        let mut li = LiveIntegrator::new();
        li.hot_load(&module("billing_client", 1));
        li.hot_load(&module("cap_client", 1));
        li.hot_load(&module("cap_client", 2));
        li.update_routing("cap", "r1");
        li.update_routing("cap", "r2");
        assert_eq!(li.rollback_depth(), 4);

        li.rollback_capability("cap");
        assert_eq!(li.rollback_depth(), 1);
        assert_eq!(li.rollback(5), 1);
        assert!(!li.is_loaded("cap_client"));
        assert!(li.route("cap").is_none());
        assert!(!li.is_loaded("billing_client"));
    }

    #[test]
    fn test_rollback_capability_rewrites_reload_of_its_module_into_add() {
        let mut li = LiveIntegrator::new();
        li.hot_load_for("first", &module("shared_client", 10));
        li.hot_load_for("second", &module("shared_client", 20));
        li.rollback_capability("first");

        // The reload made by "second" survives, but no longer restores "first".
        assert_eq!(li.rollback_depth(), 1);
        assert!(matches!(
            li.rollback_entries()[0].action,
            RollbackAction::Add { ref module_name } if module_name == "shared_client"
        ));
        assert_eq!(li.rollback(1), 1);
        assert!(!li.is_loaded("shared_client"));
        assert_eq!(li.loaded_count(), 0);
    }

    #[test]
    fn test_rollback_capability_keeps_reload_of_other_capability_module() {
        let mut li = LiveIntegrator::new();
        li.hot_load_for("first", &module("shared_client", 10));
        li.hot_load_for("second", &module("shared_client", 20));
        li.hot_load_for("third", &module("third_agent", 5));
        li.rollback_capability("third");

        assert_eq!(li.rollback(1), 1);
        let rec = li.get_status("shared_client");
        assert_eq!(rec.record().unwrap().capability.as_deref(), Some("first"));
        assert_eq!(rec.record().unwrap().line_count, 10);
    }

    #[test]
    fn test_get_status_not_loaded() {
        let li = LiveIntegrator::new();
        assert_eq!(li.get_status("nonexistent"), ModuleStatus::NotLoaded);
        assert!(!li.get_status("nonexistent").is_loaded());
    }

    proptest! {
        #[test]
        fn rollback_undoes_min_of_steps_and_depth(loads in 0usize..20, steps in 0usize..30) {
            let mut li = LiveIntegrator::new();
            for i in 0..loads {
                li.hot_load(&module(&format!("m{}", i % 4), i));
            }
            let depth = li.rollback_depth();
            prop_assert_eq!(depth, loads);
            let undone = li.rollback(steps);
            prop_assert_eq!(undone, steps.min(depth));
            prop_assert_eq!(li.rollback_depth(), depth - undone);
        }

        #[test]
        fn full_rollback_restores_empty_registry(loads in 0usize..20) {
            let mut li = LiveIntegrator::new();
            for i in 0..loads {
                li.hot_load(&module(&format!("m{}", i % 3), i));
            }
            li.rollback(usize::MAX);
            prop_assert_eq!(li.loaded_count(), 0);
        }
    }
}

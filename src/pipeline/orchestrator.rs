//! # Capability Build Orchestrator
//!
//! Drives one request through the build pipeline and hot-deploys the result:
//!
//! ```text
//! request ──► cache? ──hit──► cached copy
//!               │
//!               ▼
//!   Analyzing ──► (existing?) ──► Discovering ──► Building ──► Testing
//!                     │                                           │
//!                  Existing                        pass < ratio ──┴──► Failed
//!                                                                 │
//!                               Complete ◄── Deploying ◄── Integrating
//! ```
//!
//! ## What It Does
//!
//! 1. Serves identical (fingerprint-equal) requests from the `RequestCache`.
//! 2. Runs the phases in order, sending a progress notification as each starts.
//! 3. Checks the cumulative time budget at phase boundaries; a trip returns
//!    `Failed` with the phases completed so far.  Nothing already hot-loaded
//!    is compensated automatically.
//! 4. Fails the build after Testing when fewer than `min_pass_ratio` of the
//!    checks passed; nothing is deployed in that case.
//! 5. Hot-loads every generated module through the `LiveIntegrator`, tagged
//!    with the capability, then registers and routes the capability.
//! 6. Records every result in the build history, every fresh result in the
//!    learning table, and every fresh success in the cache.
//!
//! ## Concurrency
//!
//! Single caller at a time.  `process` takes `&mut self`; callers that share
//! an orchestrator across threads wrap it in a `Mutex`.
//!
//! ## Usage
//!
//! ```rust
//! use hotforge::pipeline::orchestrator::Orchestrator;
//!
//! let mut orc = Orchestrator::default();
//! let result = orc.process("Send a telegram notification when CPU exceeds 90%");
//! assert!(result.phases_completed.iter().any(|p| p == "discovering"));
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use crate::collab::{
    Analyzer, Builder, CapabilityChecker, Collaborators, Communicator, CredentialManager,
    Discoverer, Tester,
};
use crate::config::ForgeConfig;
use crate::model::{
    BuildPhase, BuildResult, CapabilityRequest, CapabilityStatus, CodeType, Endpoint,
    GeneratedModule, RequirementSpec, EXISTING_PHASE,
};
use crate::pipeline::cache::RequestCache;
use crate::pipeline::clock::{Clock, MonotonicClock};
use crate::pipeline::history::{BuildHistory, LearningRecord, LearningTable};
use crate::pipeline::integrator::LiveIntegrator;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// All mutable state one pipeline owns.  Independent orchestrators never
/// share any of it.
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Successful results keyed by request fingerprint.
    pub cache: RequestCache,
    /// Every result returned by `process`.
    pub history: BuildHistory,
    /// Per-capability attempt statistics.
    pub learning: LearningTable,
    /// Live modules, routes, master registry and rollback stack.
    pub integrator: LiveIntegrator,
}

impl PipelineState {
    /// Construct an empty state.
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Run: per-call bookkeeping
// ---------------------------------------------------------------------------

/// Bookkeeping for one in-flight `process` call.
struct Run {
    id: Uuid,
    request: CapabilityRequest,
    capability_name: String,
    phases: Vec<String>,
    started: Duration,
    tests_passed: usize,
    tests_total: usize,
}

impl Run {
    fn complete(&mut self, phase: BuildPhase) {
        self.phases.push(phase.as_str().to_string());
    }

    fn result(&self, status: CapabilityStatus, now: Duration, rollback_available: bool) -> BuildResult {
        BuildResult {
            id: self.id,
            request: self.request.text.clone(),
            capability_name: self.capability_name.clone(),
            status,
            phases_completed: self.phases.clone(),
            build_time_ms: now.saturating_sub(self.started).as_nanos() as f64 / 1_000_000.0,
            tests_passed: self.tests_passed,
            tests_total: self.tests_total,
            cached: false,
            rollback_available,
        }
    }
}

/// How a fresh run ended.
enum Exit {
    /// The capability already existed; nothing was built.
    Existing(BuildResult),
    /// The pipeline ran to a terminal state.
    Built(BuildResult),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// The build-pipeline state machine plus the state it mutates.
pub struct Orchestrator {
    config: ForgeConfig,
    collab: Collaborators,
    clock: Box<dyn Clock>,
    state: PipelineState,
}

impl Orchestrator {
    /// Create an orchestrator with empty state and a monotonic clock.
    pub fn new(config: ForgeConfig, collab: Collaborators) -> Self {
        tracing::info!(
            target: "hotforge::orchestrator",
            timeout_ms = config.timeout_ms,
            min_pass_ratio = config.min_pass_ratio,
            "orchestrator created"
        );
        Self {
            config,
            collab,
            clock: Box::new(MonotonicClock::new()),
            state: PipelineState::new(),
        }
    }

    /// Default collaborators configured from `config`.
    pub fn from_config(config: ForgeConfig) -> Self {
        let collab = Collaborators::with_defaults(&config);
        Self::new(config, collab)
    }

    /// Replace the time source used for the timeout check.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Start from existing state instead of an empty one.
    pub fn with_state(mut self, state: PipelineState) -> Self {
        self.state = state;
        self
    }

    /// Give up the state, e.g. to hand it to another orchestrator.
    pub fn into_state(self) -> PipelineState {
        self.state
    }

    // -----------------------------------------------------------------------
    // process
    // -----------------------------------------------------------------------

    /// Run the full pipeline for `request`.  Never panics and never returns an
    /// error: every outcome is a `BuildResult`.
    pub fn process(&mut self, request: &str) -> BuildResult {
        let request = CapabilityRequest::new(request);

        if let Some(hit) = self.state.cache.get(&request.fingerprint) {
            tracing::info!(
                target: "hotforge::orchestrator",
                capability = %hit.capability_name,
                "serving from cache"
            );
            self.state.history.append(hit.clone());
            return hit;
        }

        let fingerprint = request.fingerprint.clone();
        let (result, cacheable) = match self.execute(request) {
            Exit::Existing(result) => (result, false),
            Exit::Built(result) => (result, true),
        };

        self.state.learning.record(&result);
        if cacheable {
            self.state.cache.put(fingerprint, result.clone());
        }
        self.state.history.append(result.clone());
        result
    }

    fn execute(&mut self, request: CapabilityRequest) -> Exit {
        let started = self.clock.elapsed();
        let label: String = request.text.chars().take(30).collect();
        let mut run = Run {
            id: Uuid::new_v4(),
            request,
            capability_name: String::new(),
            phases: Vec::new(),
            started,
            tests_passed: 0,
            tests_total: 0,
        };

        // 1. Analyzing
        self.progress(&label, BuildPhase::Analyzing, "analyzing requirement");
        let spec = self.collab.analyzer.analyze(&run.request.text);
        run.capability_name = spec.capability_name();
        run.complete(BuildPhase::Analyzing);
        if let Some(failed) = self.check_timeout(&run) {
            return Exit::Built(failed);
        }

        // 2. Existing capability fast path
        if let Some(existing) = self.existing(&mut run) {
            return Exit::Existing(existing);
        }

        // 3. Discovering
        self.progress(&run.capability_name, BuildPhase::Discovering, "discovering APIs");
        let endpoints = self.discover(&spec);
        run.complete(BuildPhase::Discovering);
        if let Some(failed) = self.check_timeout(&run) {
            return Exit::Built(failed);
        }

        // 4. Building
        self.progress(&run.capability_name, BuildPhase::Building, "generating modules");
        let modules = self.build(&run.capability_name, &spec, &endpoints);
        run.complete(BuildPhase::Building);
        if let Some(failed) = self.check_timeout(&run) {
            return Exit::Built(failed);
        }

        // 5. Testing
        self.progress(&run.capability_name, BuildPhase::Testing, "running sandbox checks");
        let (passed, total) = self.test(&modules);
        run.tests_passed = passed;
        run.tests_total = total;
        if total > 0 && (passed as f64) < total as f64 * self.config.min_pass_ratio {
            let pct = passed * 100 / total;
            tracing::warn!(
                target: "hotforge::orchestrator",
                capability = %run.capability_name,
                passed,
                total,
                "pass rate below threshold, not deploying"
            );
            self.collab.communicator.send_error(
                &run.capability_name,
                &format!("only {}% of checks passed", pct),
                "review the generated modules",
            );
            return Exit::Built(run.result(CapabilityStatus::Failed, self.clock.elapsed(), true));
        }
        run.complete(BuildPhase::Testing);
        if let Some(failed) = self.check_timeout(&run) {
            return Exit::Built(failed);
        }

        // 6. Integrating
        self.progress(&run.capability_name, BuildPhase::Integrating, "hot-loading modules");
        self.integrate(&run.capability_name, &spec, &modules);
        run.complete(BuildPhase::Integrating);

        // 7. Deploying
        self.progress(&run.capability_name, BuildPhase::Deploying, "deploying");
        run.complete(BuildPhase::Deploying);

        // 8. Complete
        self.progress(&run.capability_name, BuildPhase::Complete, "done");
        self.collab.communicator.send_success(
            &run.capability_name,
            &format!("{} modules generated and deployed", modules.len()),
        );
        run.complete(BuildPhase::Complete);

        let result = run.result(CapabilityStatus::Active, self.clock.elapsed(), true);
        tracing::info!(
            target: "hotforge::orchestrator",
            capability = %result.capability_name,
            build_time_ms = result.build_time_ms,
            tests_passed = result.tests_passed,
            tests_total = result.tests_total,
            "capability deployed"
        );
        Exit::Built(result)
    }

    // -----------------------------------------------------------------------
    // Phase helpers
    // -----------------------------------------------------------------------

    fn progress(&self, capability_name: &str, phase: BuildPhase, message: &str) {
        tracing::debug!(
            target: "hotforge::orchestrator",
            capability = %capability_name,
            %phase,
            "phase started"
        );
        self.collab.communicator.send_progress(capability_name, phase, phase.percent(), message);
    }

    /// `Some(Failed)` when the cumulative budget is exceeded.
    fn check_timeout(&self, run: &Run) -> Option<BuildResult> {
        let now = self.clock.elapsed();
        let elapsed = now.saturating_sub(run.started);
        if elapsed <= self.config.timeout() {
            return None;
        }
        tracing::warn!(
            target: "hotforge::orchestrator",
            capability = %run.capability_name,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = self.config.timeout_ms,
            phases = run.phases.len(),
            "time budget exceeded"
        );
        self.collab.communicator.send_error(
            &run.capability_name,
            "timed out",
            "the build took too long; retry or raise timeout_ms",
        );
        Some(run.result(CapabilityStatus::Failed, now, !run.phases.is_empty()))
    }

    fn existing(&self, run: &mut Run) -> Option<BuildResult> {
        let name = &run.capability_name;
        if !self.collab.checker.check_exists(name) {
            return None;
        }
        let best = self.collab.checker.find_similar(name, 1).into_iter().next()?;
        if best.similarity_score < self.config.existing_similarity {
            return None;
        }
        tracing::info!(
            target: "hotforge::orchestrator",
            capability = %name,
            matched = %best.name,
            score = best.similarity_score,
            "capability already exists"
        );
        self.collab.communicator.send_success(name, "capability already exists");
        run.phases = vec![EXISTING_PHASE.to_string()];
        Some(run.result(CapabilityStatus::Active, self.clock.elapsed(), false))
    }

    fn discover(&self, spec: &RequirementSpec) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();
        for api in &spec.required_apis {
            endpoints.extend(self.collab.discoverer.search(api));
            let auth = self.collab.discoverer.get_auth_method(api);
            if auth.needs_credential() && !self.collab.credentials.has_credential(api) {
                self.collab.credentials.request_api_key(api);
            }
        }
        endpoints
    }

    fn build(
        &self,
        capability_name: &str,
        spec: &RequirementSpec,
        endpoints: &[Endpoint],
    ) -> Vec<GeneratedModule> {
        let builder = &self.collab.builder;
        let mut modules = Vec::new();
        for api in &spec.required_apis {
            let matching: Vec<Endpoint> =
                endpoints.iter().filter(|ep| ep.name.contains(api.as_str())).cloned().collect();
            if !matching.is_empty() {
                modules.push(builder.generate_client(api, &matching));
            }
        }
        modules.push(builder.generate_agent(capability_name, spec));
        modules.push(builder.generate_models(capability_name));
        let tests = builder.generate_tests(capability_name, &modules);
        modules.push(tests);

        let wiring = builder.wire_together(&modules);
        tracing::debug!(
            target: "hotforge::orchestrator",
            capability = %capability_name,
            modules = wiring.modules.len(),
            dependencies = wiring.dependencies.len(),
            total_lines = wiring.total_lines,
            "modules wired"
        );
        modules
    }

    /// `(passed, total)` over every non-test module.
    fn test(&self, modules: &[GeneratedModule]) -> (usize, usize) {
        let mut passed = 0;
        let mut total = 0;
        for module in modules.iter().filter(|m| m.code_type != CodeType::Test) {
            for r in self.collab.tester.run_all_checks(module) {
                total += 1;
                if r.status.is_passed() {
                    passed += 1;
                }
            }
        }
        (passed, total)
    }

    fn integrate(&mut self, capability_name: &str, spec: &RequirementSpec, modules: &[GeneratedModule]) {
        let integrator = &mut self.state.integrator;
        for module in modules {
            integrator.hot_load_for(capability_name, module);
        }
        let handler_info = BTreeMap::from([("intent".to_string(), spec.parsed_intent.clone())]);
        integrator.register_with_master(capability_name, handler_info);
        integrator.update_routing(capability_name, &format!("jit_{}", capability_name));
    }

    // -----------------------------------------------------------------------
    // rollback
    // -----------------------------------------------------------------------

    /// Remove a deployed capability and evict its cached results.
    pub fn rollback(&mut self, capability_name: &str) -> bool {
        if !self.state.integrator.rollback_capability(capability_name) {
            return false;
        }
        let evicted = self.state.cache.evict_capability(capability_name);
        tracing::info!(
            target: "hotforge::orchestrator",
            capability = %capability_name,
            evicted,
            "capability rolled back"
        );
        self.collab.communicator.send_error(
            capability_name,
            "capability rolled back",
            "it can be requested again",
        );
        true
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Read-only view of all owned state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Number of cached successes.
    pub fn cache_count(&self) -> usize {
        self.state.cache.len()
    }

    /// Number of results that ran the pipeline (cache hits excluded).
    pub fn build_count(&self) -> usize {
        self.state.history.fresh_count()
    }

    /// Every returned result, cache hits included, in call order.
    pub fn history(&self) -> &[BuildResult] {
        self.state.history.entries()
    }

    /// Learning record for `capability_name`, if it was ever built.
    pub fn learning(&self, capability_name: &str) -> Option<&LearningRecord> {
        self.state.learning.get(capability_name)
    }

    /// `successes / attempts` for `capability_name`.
    pub fn success_rate(&self, capability_name: &str) -> Option<f64> {
        self.state.learning.success_rate(capability_name)
    }

    /// The live integrator.
    pub fn integrator(&self) -> &LiveIntegrator {
        &self.state.integrator
    }

    /// Direct access for operator-driven stack rollback.
    pub fn integrator_mut(&mut self) -> &mut LiveIntegrator {
        &mut self.state.integrator
    }

    /// The requirement analyzer.
    pub fn analyzer(&self) -> &dyn Analyzer {
        self.collab.analyzer.as_ref()
    }

    /// The existing-capability checker.
    pub fn checker(&self) -> &dyn CapabilityChecker {
        self.collab.checker.as_ref()
    }

    /// The API discoverer.
    pub fn discoverer(&self) -> &dyn Discoverer {
        self.collab.discoverer.as_ref()
    }

    /// The credential manager.
    pub fn credentials(&self) -> &dyn CredentialManager {
        self.collab.credentials.as_ref()
    }

    /// The module builder.
    pub fn builder(&self) -> &dyn Builder {
        self.collab.builder.as_ref()
    }

    /// The sandbox tester.
    pub fn tester(&self) -> &dyn Tester {
        self.collab.tester.as_ref()
    }

    /// The operator communicator.
    pub fn communicator(&self) -> &dyn Communicator {
        self.collab.communicator.as_ref()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::from_config(ForgeConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

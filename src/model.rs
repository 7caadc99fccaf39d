//! # Module: model
//!
//! Shared data model for the forge pipeline: requests and their fingerprints,
//! build phases, build results, generated modules, and sandbox check results.
//!
//! ## Guarantees
//! - `BuildResult` is never mutated after it is returned; a cache hit is a
//!   copy with `cached = true`.
//! - Fingerprinting is exact: trimmed and case-folded, nothing more.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current Unix time in milliseconds.  Returns 0 if the clock is before 1970.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// CapabilityRequest
// ---------------------------------------------------------------------------

/// Raw operator request text together with its cache fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequest {
    /// Request text as submitted.
    pub text: String,
    /// Trimmed, lowercased text used as the cache key.
    pub fingerprint: String,
}

impl CapabilityRequest {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = fingerprint(&text);
        Self { text, fingerprint }
    }
}

/// Normalize request text into a cache key: trim, then lowercase.
///
/// Inner whitespace is preserved; `"Foo"` and `"foo  "` collide but
/// `"a b"` and `"a  b"` do not.
pub fn fingerprint(text: &str) -> String {
    text.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// CapabilityStatus / BuildPhase
// ---------------------------------------------------------------------------

/// Terminal status of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    Active,
    Failed,
}

impl std::fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityStatus::Active => write!(f, "active"),
            CapabilityStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Marker recorded in `phases_completed` when the fast path skips the build.
pub const EXISTING_PHASE: &str = "existing";

/// One named stage of the build pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Analyzing,
    Discovering,
    Building,
    Testing,
    Integrating,
    Deploying,
    Complete,
}

impl BuildPhase {
    pub const ALL: [BuildPhase; 7] = [
        BuildPhase::Analyzing,
        BuildPhase::Discovering,
        BuildPhase::Building,
        BuildPhase::Testing,
        BuildPhase::Integrating,
        BuildPhase::Deploying,
        BuildPhase::Complete,
    ];

    /// Name used in `phases_completed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Analyzing => "analyzing",
            BuildPhase::Discovering => "discovering",
            BuildPhase::Building => "building",
            BuildPhase::Testing => "testing",
            BuildPhase::Integrating => "integrating",
            BuildPhase::Deploying => "deploying",
            BuildPhase::Complete => "complete",
        }
    }

    /// Progress percentage reported when the phase starts.
    pub fn percent(&self) -> f64 {
        match self {
            BuildPhase::Analyzing => 10.0,
            BuildPhase::Discovering => 25.0,
            BuildPhase::Building => 45.0,
            BuildPhase::Testing => 65.0,
            BuildPhase::Integrating => 80.0,
            BuildPhase::Deploying => 95.0,
            BuildPhase::Complete => 100.0,
        }
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BuildResult
// ---------------------------------------------------------------------------

/// Outcome of one `Orchestrator::process` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Unique id of the run that produced this result.  Cache hits keep the
    /// id of the original run.
    pub id: Uuid,
    /// Request text exactly as submitted.
    pub request: String,
    /// Name derived from the parsed intent, e.g. `send_telegram`.
    pub capability_name: String,
    /// Terminal status of the run.
    pub status: CapabilityStatus,
    /// Names of the phases that finished, in order.
    pub phases_completed: Vec<String>,
    /// Elapsed time from request start to the terminal state.
    pub build_time_ms: f64,
    /// Checks that passed across all non-test modules.
    pub tests_passed: usize,
    /// Checks run across all non-test modules.
    pub tests_total: usize,
    /// `true` when served from the request cache.
    pub cached: bool,
    /// `true` when the run got far enough to leave something to undo.
    pub rollback_available: bool,
}

impl BuildResult {
    /// `true` for `Active`.
    pub fn is_active(&self) -> bool {
        self.status == CapabilityStatus::Active
    }

    /// `tests_passed / max(tests_total, 1)`.
    pub fn test_ratio(&self) -> f64 {
        self.tests_passed as f64 / self.tests_total.max(1) as f64
    }

    pub fn completed(&self, phase: BuildPhase) -> bool {
        self.phases_completed.iter().any(|p| p == phase.as_str())
    }

    /// Copy returned on a cache hit.
    pub fn as_cached(&self) -> Self {
        Self { cached: true, ..self.clone() }
    }
}

// ---------------------------------------------------------------------------
// Requirements / discovery
// ---------------------------------------------------------------------------

/// Structured reading of a request produced by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub raw_request: String,
    /// `<verb>:<subject>`, e.g. `send:telegram`.
    pub parsed_intent: String,
    pub required_apis: Vec<String>,
}

impl RequirementSpec {
    /// Capability name derived from the intent: `:` and spaces become `_`.
    pub fn capability_name(&self) -> String {
        self.parsed_intent.replace([':', ' '], "_")
    }
}

/// How a third-party API authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    None,
    ApiKey,
    BearerToken,
    OAuth2,
    Basic,
}

impl AuthMethod {
    pub fn needs_credential(&self) -> bool {
        *self != AuthMethod::None
    }
}

/// One endpoint of a catalogued API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// `<api>.<operation>`, e.g. `telegram.sendMessage`.
    pub name: String,
    pub base_url: String,
    pub path: String,
    pub method: String,
    pub auth_method: AuthMethod,
}

/// A known capability and how close it is to a queried name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCapability {
    pub name: String,
    /// In `[0, 1]`.
    pub similarity_score: f64,
}

// ---------------------------------------------------------------------------
// Generated modules
// ---------------------------------------------------------------------------

/// What kind of code a generated module holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    Client,
    Agent,
    Model,
    Test,
}

impl std::fmt::Display for CodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeType::Client => write!(f, "client"),
            CodeType::Agent => write!(f, "agent"),
            CodeType::Model => write!(f, "model"),
            CodeType::Test => write!(f, "test"),
        }
    }
}

/// A module produced by the builder and consumed by the tester and integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModule {
    pub module_name: String,
    pub code_type: CodeType,
    pub line_count: usize,
    pub dependencies: Vec<String>,
}

impl GeneratedModule {
    pub fn new(module_name: impl Into<String>, code_type: CodeType, line_count: usize) -> Self {
        Self {
            module_name: module_name.into(),
            code_type,
            line_count,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Sandbox checks
// ---------------------------------------------------------------------------

/// The outcome of one sandbox check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passed,
    Failed { reason: String },
    /// The check itself could not run to completion.
    Error { reason: String },
}

impl CheckStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, CheckStatus::Passed)
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "PASS"),
            CheckStatus::Failed { reason } => write!(f, "FAIL: {}", reason),
            CheckStatus::Error { reason } => write!(f, "ERROR: {}", reason),
        }
    }
}

/// Result of one named check against one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: String,
    pub module_name: String,
    pub status: CheckStatus,
}

impl CheckResult {
    pub fn passed(check: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self { check: check.into(), module_name: module_name.into(), status: CheckStatus::Passed }
    }

    pub fn failed(
        check: impl Into<String>,
        module_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            module_name: module_name.into(),
            status: CheckStatus::Failed { reason: reason.into() },
        }
    }

    pub fn error(
        check: impl Into<String>,
        module_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            module_name: module_name.into(),
            status: CheckStatus::Error { reason: reason.into() },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

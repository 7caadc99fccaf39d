//! # Module: collab
//!
//! Contracts for the services the orchestrator calls during a build, plus
//! deterministic in-memory implementations of each so a pipeline can run
//! end-to-end without external systems.
//!
//! Every trait is object-safe and takes `&self`; implementations that keep
//! state use interior mutability.  Collaborators report failure as data
//! (`CheckStatus::Failed`/`Error`, empty endpoint lists), never by panicking.
//!
//! ## Sub-modules
//! - [`analyzer`]     : request text → `RequirementSpec`
//! - [`checker`]      : known-capability registry and similarity lookup
//! - [`catalog`]      : static API catalog (endpoints, auth, rate limits)
//! - [`credentials`]  : stored credentials and pending key requests
//! - [`builder`]      : template module generation and wiring metadata
//! - [`sandbox`]      : per-module checks, including custom checks
//! - [`communicator`] : operator notifications

pub mod analyzer;
pub mod builder;
pub mod catalog;
pub mod checker;
pub mod communicator;
pub mod credentials;
pub mod sandbox;

use std::sync::Arc;

use crate::config::ForgeConfig;
use crate::model::{
    AuthMethod, BuildPhase, CheckResult, Endpoint, GeneratedModule, RequirementSpec,
    SimilarCapability,
};

pub use analyzer::KeywordAnalyzer;
pub use builder::{TemplateBuilder, WiringMetadata};
pub use catalog::StaticCatalog;
pub use checker::RegistryChecker;
pub use communicator::{Notification, NotificationKind, RecordingCommunicator};
pub use credentials::CredentialStore;
pub use sandbox::{CustomCheck, SandboxTester};

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Turns free-form request text into a structured requirement.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> RequirementSpec;
}

/// Knows which capabilities already exist.
pub trait CapabilityChecker: Send + Sync {
    fn check_exists(&self, name: &str) -> bool;

    /// Up to `top_k` known capabilities, highest `similarity_score` first.
    fn find_similar(&self, name: &str, top_k: usize) -> Vec<SimilarCapability>;
}

/// Looks up third-party APIs.
pub trait Discoverer: Send + Sync {
    fn search(&self, api_name: &str) -> Vec<Endpoint>;
    fn get_auth_method(&self, api_name: &str) -> AuthMethod;
}

/// Credential bookkeeping.  `request_api_key` is a side effect only.
pub trait CredentialManager: Send + Sync {
    fn has_credential(&self, service: &str) -> bool;
    fn request_api_key(&self, service: &str);
}

/// Generates module definitions for a capability.
pub trait Builder: Send + Sync {
    fn generate_client(&self, api_name: &str, endpoints: &[Endpoint]) -> GeneratedModule;
    fn generate_agent(&self, capability_name: &str, spec: &RequirementSpec) -> GeneratedModule;
    fn generate_models(&self, capability_name: &str) -> GeneratedModule;
    fn generate_tests(&self, capability_name: &str, modules: &[GeneratedModule]) -> GeneratedModule;
    /// Aggregate metadata over a set of modules.  Informational only.
    fn wire_together(&self, modules: &[GeneratedModule]) -> WiringMetadata;
}

/// Runs sandbox checks against a module.  Must convert every internal
/// failure into a `Failed` or `Error` result.
pub trait Tester: Send + Sync {
    fn run_all_checks(&self, module: &GeneratedModule) -> Vec<CheckResult>;
}

/// Fire-and-forget operator notifications.
pub trait Communicator: Send + Sync {
    fn send_progress(&self, capability_name: &str, phase: BuildPhase, percent: f64, message: &str);
    fn send_error(&self, capability_name: &str, message: &str, suggestion: &str);
    fn send_success(&self, capability_name: &str, message: &str);
}

// Shared handles let callers keep a reference to a stateful collaborator
// (e.g. to inspect recorded notifications) after handing it to the pipeline.

impl<T: Tester + ?Sized> Tester for Arc<T> {
    fn run_all_checks(&self, module: &GeneratedModule) -> Vec<CheckResult> {
        (**self).run_all_checks(module)
    }
}

impl<T: Communicator + ?Sized> Communicator for Arc<T> {
    fn send_progress(&self, capability_name: &str, phase: BuildPhase, percent: f64, message: &str) {
        (**self).send_progress(capability_name, phase, percent, message)
    }

    fn send_error(&self, capability_name: &str, message: &str, suggestion: &str) {
        (**self).send_error(capability_name, message, suggestion)
    }

    fn send_success(&self, capability_name: &str, message: &str) {
        (**self).send_success(capability_name, message)
    }
}

impl<T: CredentialManager + ?Sized> CredentialManager for Arc<T> {
    fn has_credential(&self, service: &str) -> bool {
        (**self).has_credential(service)
    }

    fn request_api_key(&self, service: &str) {
        (**self).request_api_key(service)
    }
}

impl<T: CapabilityChecker + ?Sized> CapabilityChecker for Arc<T> {
    fn check_exists(&self, name: &str) -> bool {
        (**self).check_exists(name)
    }

    fn find_similar(&self, name: &str, top_k: usize) -> Vec<SimilarCapability> {
        (**self).find_similar(name, top_k)
    }
}

impl<T: Analyzer + ?Sized> Analyzer for Arc<T> {
    fn analyze(&self, text: &str) -> RequirementSpec {
        (**self).analyze(text)
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The full set of services one orchestrator calls.
pub struct Collaborators {
    pub analyzer: Box<dyn Analyzer>,
    pub checker: Box<dyn CapabilityChecker>,
    pub discoverer: Box<dyn Discoverer>,
    pub credentials: Box<dyn CredentialManager>,
    pub builder: Box<dyn Builder>,
    pub tester: Box<dyn Tester>,
    pub communicator: Box<dyn Communicator>,
}

impl Collaborators {
    /// In-memory defaults, with the sandbox line ceiling taken from `config`.
    pub fn with_defaults(config: &ForgeConfig) -> Self {
        Self {
            analyzer: Box::new(KeywordAnalyzer::new()),
            checker: Box::new(RegistryChecker::with_builtins()),
            discoverer: Box::new(StaticCatalog::new()),
            credentials: Box::new(CredentialStore::new()),
            builder: Box::new(TemplateBuilder::new()),
            tester: Box::new(SandboxTester::new(config.max_module_lines)),
            communicator: Box::new(RecordingCommunicator::new()),
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    pub fn with_checker(mut self, checker: impl CapabilityChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn with_discoverer(mut self, discoverer: impl Discoverer + 'static) -> Self {
        self.discoverer = Box::new(discoverer);
        self
    }

    pub fn with_credentials(mut self, credentials: impl CredentialManager + 'static) -> Self {
        self.credentials = Box::new(credentials);
        self
    }

    pub fn with_builder(mut self, builder: impl Builder + 'static) -> Self {
        self.builder = Box::new(builder);
        self
    }

    pub fn with_tester(mut self, tester: impl Tester + 'static) -> Self {
        self.tester = Box::new(tester);
        self
    }

    pub fn with_communicator(mut self, communicator: impl Communicator + 'static) -> Self {
        self.communicator = Box::new(communicator);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::with_defaults(&ForgeConfig::default())
    }
}

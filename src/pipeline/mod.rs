//! # Module: pipeline
//!
//! The build-and-deploy core: the orchestrator state machine and the state
//! it owns.
//!
//! ## Sub-modules
//! - [`orchestrator`] : request → phases → `BuildResult`
//! - [`integrator`]   : live module registry, routing, rollback stack
//! - [`cache`]        : fingerprint-keyed cache of successful results
//! - [`history`]      : append-only build history and per-capability learning
//! - [`clock`]        : injectable time source for the timeout budget

pub mod cache;
pub mod clock;
pub mod history;
pub mod integrator;
pub mod orchestrator;

pub use cache::RequestCache;
pub use clock::{Clock, MonotonicClock};
pub use history::{BuildHistory, LearningRecord, LearningTable};
pub use integrator::{LiveIntegrator, ModuleRecord, ModuleStatus, RollbackAction, RollbackEntry};
pub use orchestrator::{Orchestrator, PipelineState};

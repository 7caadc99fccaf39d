//! # hotforge
//!
//! Turns a natural-language capability request into generated modules, runs
//! them through sandbox checks, and hot-deploys them into a live module
//! registry with full rollback.
//!
//! ```text
//! request ─► Orchestrator ─► Analyzer ─► CapabilityChecker ─► Discoverer/CredentialManager
//!                 │                                                  │
//!                 │                      Builder ◄───────────────────┘
//!                 │                         │
//!                 │                      Tester ─► LiveIntegrator (modules, routes, master, stack)
//!                 │
//!                 └─► RequestCache · BuildHistory · LearningTable · Communicator
//! ```
//!
//! ## Modules
//! - [`pipeline`] : orchestrator state machine and the state it owns
//! - [`collab`]   : collaborator contracts and in-memory implementations
//! - [`model`]    : shared value types (`BuildResult`, `GeneratedModule`, ...)
//! - [`config`]   : TOML configuration and tracing setup
//! - [`error`]    : `ForgeError`
//! - [`cli`]      : command-line arguments and rendering for the binary

pub mod cli;
pub mod collab;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;

pub use collab::Collaborators;
pub use config::ForgeConfig;
pub use error::{ForgeError, Result};
pub use model::{BuildPhase, BuildResult, CapabilityStatus, CodeType, GeneratedModule};
pub use pipeline::{LiveIntegrator, Orchestrator, PipelineState};

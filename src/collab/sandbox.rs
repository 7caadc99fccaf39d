//! # Stage: SandboxTester
//!
//! ## Responsibility
//! Runs a fixed set of static checks against each generated module, then any
//! registered custom checks, and reports one `CheckResult` per check.
//!
//! Built-in checks (in order):
//! 1. `isolated`    : the module is non-empty
//! 2. `performance` : `line_count` is within the configured ceiling
//! 3. `security`    : no forbidden dependency is declared
//!
//! ## Guarantees
//! - Boundary conversion: a custom check returning `Err` becomes a `Failed`
//!   (for `ForgeError::CheckFailed`) or `Error` (anything else) result.  No
//!   error value crosses into the orchestrator.
//! - Auditable: every result is kept for `pass_count` / `fail_count`.

use std::sync::Mutex;

use crate::collab::Tester;
use crate::error::ForgeError;
use crate::model::{CheckResult, CheckStatus, GeneratedModule};

/// Dependencies that fail the security check.
const FORBIDDEN_DEPENDENCIES: &[&str] = &["subprocess", "eval", "exec", "shell", "unsafe_ffi"];

/// A user-supplied check.  Return `Err(ForgeError::CheckFailed { .. })` to
/// reject the module; any other error is reported as a check error.
pub trait CustomCheck: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, module: &GeneratedModule) -> Result<(), ForgeError>;
}

/// Adapter turning a closure into a [`CustomCheck`].
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F> FnCheck<F>
where
    F: Fn(&GeneratedModule) -> Result<(), ForgeError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> CustomCheck for FnCheck<F>
where
    F: Fn(&GeneratedModule) -> Result<(), ForgeError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, module: &GeneratedModule) -> Result<(), ForgeError> {
        (self.f)(module)
    }
}

/// The default tester.
pub struct SandboxTester {
    max_lines: usize,
    custom: Vec<Box<dyn CustomCheck>>,
    results: Mutex<Vec<CheckResult>>,
}

impl SandboxTester {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines, custom: Vec::new(), results: Mutex::new(Vec::new()) }
    }

    /// Register a check that runs after the built-in ones.
    pub fn add_check(&mut self, check: Box<dyn CustomCheck>) {
        self.custom.push(check);
    }

    pub fn result_count(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn pass_count(&self) -> usize {
        self.results
            .lock()
            .map(|r| r.iter().filter(|c| c.status.is_passed()).count())
            .unwrap_or(0)
    }

    pub fn fail_count(&self) -> usize {
        self.result_count() - self.pass_count()
    }

    fn isolated(&self, module: &GeneratedModule) -> CheckResult {
        if module.line_count == 0 {
            CheckResult::failed("isolated", &module.module_name, "module is empty")
        } else {
            CheckResult::passed("isolated", &module.module_name)
        }
    }

    fn performance(&self, module: &GeneratedModule) -> CheckResult {
        if module.line_count > self.max_lines {
            CheckResult::failed(
                "performance",
                &module.module_name,
                format!("{} lines exceeds limit of {}", module.line_count, self.max_lines),
            )
        } else {
            CheckResult::passed("performance", &module.module_name)
        }
    }

    fn security(&self, module: &GeneratedModule) -> CheckResult {
        let issues: Vec<&str> = module
            .dependencies
            .iter()
            .map(String::as_str)
            .filter(|d| FORBIDDEN_DEPENDENCIES.contains(d))
            .collect();
        if issues.is_empty() {
            CheckResult::passed("security", &module.module_name)
        } else {
            CheckResult::failed(
                "security",
                &module.module_name,
                format!("forbidden dependencies: {}", issues.join(", ")),
            )
        }
    }

    fn run_custom(&self, check: &dyn CustomCheck, module: &GeneratedModule) -> CheckResult {
        match check.check(module) {
            Ok(()) => CheckResult::passed(check.name(), &module.module_name),
            Err(ForgeError::CheckFailed { reason, .. }) => {
                CheckResult::failed(check.name(), &module.module_name, reason)
            }
            Err(other) => CheckResult::error(check.name(), &module.module_name, other.to_string()),
        }
    }
}

impl Tester for SandboxTester {
    fn run_all_checks(&self, module: &GeneratedModule) -> Vec<CheckResult> {
        let mut results = vec![self.isolated(module), self.performance(module), self.security(module)];
        for check in &self.custom {
            results.push(self.run_custom(check.as_ref(), module));
        }
        for r in results.iter().filter(|r| !r.status.is_passed()) {
            tracing::debug!(
                target: "hotforge::sandbox",
                module = %r.module_name,
                check = %r.check,
                status = %r.status,
                "check did not pass"
            );
        }
        if let Ok(mut log) = self.results.lock() {
            log.extend(results.iter().cloned());
        }
        results
    }
}

// ---------------------------------------------------------------------------
// PassAllTester / FailAllTester
// ---------------------------------------------------------------------------

/// A `Tester` where every module passes one check.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassAllTester;

impl Tester for PassAllTester {
    fn run_all_checks(&self, module: &GeneratedModule) -> Vec<CheckResult> {
        vec![CheckResult::passed("pass_all", &module.module_name)]
    }
}

/// A `Tester` where every module fails one check with a fixed reason.
#[derive(Debug, Clone)]
pub struct FailAllTester {
    reason: String,
}

impl FailAllTester {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl Tester for FailAllTester {
    fn run_all_checks(&self, module: &GeneratedModule) -> Vec<CheckResult> {
        vec![CheckResult::failed("fail_all", &module.module_name, &self.reason)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodeType;

    fn module(lines: usize, deps: &[&str]) -> GeneratedModule {
        GeneratedModule::new("m", CodeType::Client, lines).with_dependencies(deps)
    }

    #[test]
    fn test_clean_module_passes_three_checks() {
        let t = SandboxTester::new(500);
        let res = t.run_all_checks(&module(10, &["serde"]));
        assert_eq!(res.len(), 3);
        assert!(res.iter().all(|r| r.status.is_passed()));
    }

    #[test]
    fn test_empty_module_fails_isolated() {
        let t = SandboxTester::new(500);
        let res = t.run_all_checks(&module(0, &[]));
        assert!(matches!(res[0].status, CheckStatus::Failed { .. }));
    }

    #[test]
    fn test_oversized_module_fails_performance() {
        let t = SandboxTester::new(50);
        let res = t.run_all_checks(&module(51, &[]));
        assert_eq!(res[1].check, "performance");
        assert!(!res[1].status.is_passed());
    }

    #[test]
    fn test_forbidden_dependency_fails_security() {
        let t = SandboxTester::new(500);
        let res = t.run_all_checks(&module(5, &["serde", "subprocess"]));
        match &res[2].status {
            CheckStatus::Failed { reason } => assert!(reason.contains("subprocess")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_check_rejection_becomes_failed() {
        let mut t = SandboxTester::new(500);
        t.add_check(Box::new(FnCheck::new("naming", |m: &GeneratedModule| {
            Err(ForgeError::CheckFailed { check: "naming".into(), reason: format!("{} is bad", m.module_name) })
        })));
        let res = t.run_all_checks(&module(5, &[]));
        assert_eq!(res.len(), 4);
        assert_eq!(res[3].status, CheckStatus::Failed { reason: "m is bad".into() });
    }

    #[test]
    fn test_custom_check_other_error_becomes_error() {
        let mut t = SandboxTester::new(500);
        t.add_check(Box::new(FnCheck::new("broken", |_: &GeneratedModule| {
            Err(ForgeError::InvalidConfig { key: "x", reason: "boom".into() })
        })));
        let res = t.run_all_checks(&module(5, &[]));
        assert!(matches!(res[3].status, CheckStatus::Error { .. }));
    }

    #[test]
    fn test_pass_and_fail_counts() {
        let t = SandboxTester::new(500);
        t.run_all_checks(&module(5, &[]));
        t.run_all_checks(&module(0, &["eval"]));
        assert_eq!(t.result_count(), 6);
        assert_eq!(t.pass_count(), 4);
        assert_eq!(t.fail_count(), 2);
    }

    #[test]
    fn test_fixed_testers() {
        let m = module(5, &[]);
        assert!(PassAllTester.run_all_checks(&m)[0].status.is_passed());
        assert!(!FailAllTester::new("nope").run_all_checks(&m)[0].status.is_passed());
    }
}

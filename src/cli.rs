use std::path::PathBuf;

use clap::Parser;
use colored::*;

use crate::config::ForgeConfig;
use crate::model::{BuildResult, CapabilityStatus};

#[derive(Parser, Debug)]
#[command(name = "hotforge")]
#[command(version)]
#[command(about = "Build, test and hot-deploy capabilities from natural-language requests")]
pub struct Args {
    /// One or more requests, processed in order through the same pipeline
    #[arg(required = true)]
    pub requests: Vec<String>,

    /// TOML config file (defaults are used when it does not exist)
    #[arg(long, default_value = "hotforge.toml")]
    pub config: PathBuf,

    /// Override the per-request time budget, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Roll back this capability after all requests are processed
    #[arg(long)]
    pub rollback: Option<String>,

    /// Print results as JSON instead of colored summaries
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, mut config: ForgeConfig) -> ForgeConfig {
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        config
    }
}

/// One colored line per result.
pub fn render_summary(result: &BuildResult) -> String {
    let status = match result.status {
        CapabilityStatus::Active => "ACTIVE".bright_green().bold(),
        CapabilityStatus::Failed => "FAILED".bright_red().bold(),
    };
    let origin = if result.cached { " (cached)".bright_blue().to_string() } else { String::new() };
    format!(
        "{} {}{} {} {}/{} checks, {:.1} ms [{}]",
        status,
        result.capability_name.bright_white(),
        origin,
        "|".dimmed(),
        result.tests_passed,
        result.tests_total,
        result.build_time_ms,
        result.phases_completed.join(" > "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample(status: CapabilityStatus, cached: bool) -> BuildResult {
        BuildResult {
            id: Uuid::new_v4(),
            request: "send slack".into(),
            capability_name: "send_slack".into(),
            status,
            phases_completed: vec!["analyzing".into(), "discovering".into()],
            build_time_ms: 1.25,
            tests_passed: 2,
            tests_total: 3,
            cached,
            rollback_available: true,
        }
    }

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["hotforge", "send a slack message"]);
        assert_eq!(args.requests, vec!["send a slack message"]);
        assert_eq!(args.config, PathBuf::from("hotforge.toml"));
        assert!(args.timeout_ms.is_none());
        assert!(args.rollback.is_none());
        assert!(!args.json);
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "hotforge",
            "first",
            "second",
            "--config",
            "custom.toml",
            "--timeout-ms",
            "500",
            "--rollback",
            "send_slack",
            "--json",
        ]);
        assert_eq!(args.requests, vec!["first", "second"]);
        assert_eq!(args.config, PathBuf::from("custom.toml"));
        assert_eq!(args.timeout_ms, Some(500));
        assert_eq!(args.rollback.as_deref(), Some("send_slack"));
        assert!(args.json);
    }

    #[test]
    fn test_args_require_a_request() {
        assert!(Args::try_parse_from(["hotforge"]).is_err());
    }

    #[test]
    fn test_args_reject_non_numeric_timeout() {
        assert!(Args::try_parse_from(["hotforge", "x", "--timeout-ms", "soon"]).is_err());
    }

    #[test]
    fn test_timeout_override_applies() {
        let args = Args::parse_from(["hotforge", "x", "--timeout-ms", "7"]);
        let config = args.apply_overrides(ForgeConfig::default());
        assert_eq!(config.timeout_ms, 7);
        assert_eq!(config.min_pass_ratio, 0.5);
    }

    #[test]
    fn test_no_override_keeps_config() {
        let args = Args::parse_from(["hotforge", "x"]);
        let base = ForgeConfig { timeout_ms: 42, ..ForgeConfig::default() };
        assert_eq!(args.apply_overrides(base.clone()), base);
    }

    #[test]
    fn test_render_summary_contents() {
        colored::control::set_override(false);
        let line = render_summary(&sample(CapabilityStatus::Failed, false));
        assert!(line.starts_with("FAILED send_slack"));
        assert!(line.contains("2/3 checks"));
        assert!(line.contains("analyzing > discovering"));
        assert!(!line.contains("cached"));
    }

    #[test]
    fn test_render_summary_marks_cache_hits() {
        colored::control::set_override(false);
        let line = render_summary(&sample(CapabilityStatus::Active, true));
        assert!(line.contains("ACTIVE"));
        assert!(line.contains("(cached)"));
    }
}

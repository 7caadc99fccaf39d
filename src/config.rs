//! # Module: config
//!
//! ## Responsibility
//! Runtime configuration for the forge pipeline, read from a TOML file, plus
//! installation of the global tracing subscriber for the binary.
//!
//! ## Guarantees
//! - A missing config file is not an error: defaults are used.
//! - An unreadable or malformed file is an error, never silently ignored.
//! - Every loaded config has passed [`ForgeConfig::validate`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{ForgeError, Result};

// ---------------------------------------------------------------------------
// ForgeConfig
// ---------------------------------------------------------------------------

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Cumulative time budget for one `process()` call, in milliseconds.
    pub timeout_ms: u64,
    /// Testing fails the build when `passed < total * min_pass_ratio`.
    pub min_pass_ratio: f64,
    /// Similarity at or above which an existing capability short-circuits the build.
    pub existing_similarity: f64,
    /// Line ceiling used by the sandbox performance check.
    pub max_module_lines: usize,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            min_pass_ratio: 0.5,
            existing_similarity: 0.8,
            max_module_lines: 500,
            log_level: "info".to_string(),
        }
    }
}

impl ForgeConfig {
    /// The timeout budget as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_pass_ratio) {
            return Err(ForgeError::InvalidConfig {
                key: "min_pass_ratio",
                reason: format!("{} is not within [0, 1]", self.min_pass_ratio),
            });
        }
        if !(0.0..=1.0).contains(&self.existing_similarity) {
            return Err(ForgeError::InvalidConfig {
                key: "existing_similarity",
                reason: format!("{} is not within [0, 1]", self.existing_similarity),
            });
        }
        Ok(())
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self> {
        let config: ForgeConfig = toml::from_str(text).map_err(|source| ForgeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    target: "hotforge::config",
                    path = %path.display(),
                    "no config file found, using defaults"
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ForgeError::ConfigRead { path: path.to_path_buf(), source });
            }
        };
        Self::from_toml_str(path, &text)
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install the global `fmt` subscriber.  `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|_| ForgeError::TracingInit)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_values() {
        let c = ForgeConfig::default();
        assert_eq!(c.timeout_ms, 120_000);
        assert_eq!(c.min_pass_ratio, 0.5);
        assert_eq!(c.existing_similarity, 0.8);
        assert_eq!(c.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let c = ForgeConfig::load(&dir.path().join("forge.toml")).unwrap();
        assert_eq!(c, ForgeConfig::default());
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "timeout_ms = 250\nmin_pass_ratio = 0.75").unwrap();
        let c = ForgeConfig::load(f.path()).unwrap();
        assert_eq!(c.timeout_ms, 250);
        assert_eq!(c.min_pass_ratio, 0.75);
        assert_eq!(c.existing_similarity, 0.8);
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "timeout_ms = \"soon\"").unwrap();
        let err = ForgeConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ForgeError::ConfigParse { .. }));
    }

    #[test]
    fn test_out_of_range_ratio_rejected() {
        let err = ForgeConfig::from_toml_str(Path::new("x.toml"), "min_pass_ratio = 1.5")
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfig { key: "min_pass_ratio", .. }));
    }

    #[test]
    fn test_out_of_range_similarity_rejected() {
        let err = ForgeConfig::from_toml_str(Path::new("x.toml"), "existing_similarity = -0.1")
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfig { key: "existing_similarity", .. }));
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let c = ForgeConfig { timeout_ms: 9, ..ForgeConfig::default() };
        let text = toml::to_string(&c).unwrap();
        let back = ForgeConfig::from_toml_str(Path::new("x.toml"), &text).unwrap();
        assert_eq!(back, c);
    }
}

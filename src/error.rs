//! # Module: error
//!
//! Crate-level error type.  The pipeline core never returns these across the
//! orchestrator boundary; they surface only at the edges (config loading,
//! CLI output, and custom sandbox checks that are converted to data by the
//! tester before the orchestrator sees them).

use std::path::PathBuf;

/// All fallible edges of the crate.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// The config file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file was read but is not valid TOML for `ForgeConfig`.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A config value is out of its accepted range.
    #[error("invalid config value for `{key}`: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    /// A custom sandbox check rejected a module.
    #[error("check `{check}` failed: {reason}")]
    CheckFailed { check: String, reason: String },

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tracing subscriber already installed")]
    TracingInit,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display_names_key() {
        let err = ForgeError::InvalidConfig {
            key: "min_pass_ratio",
            reason: "must be within [0, 1]".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for `min_pass_ratio`: must be within [0, 1]"
        );
    }

    #[test]
    fn test_check_failed_display() {
        let err = ForgeError::CheckFailed { check: "lint".into(), reason: "tabs".into() };
        assert_eq!(err.to_string(), "check `lint` failed: tabs");
    }

    #[test]
    fn test_json_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ForgeError = bad.into();
        assert!(matches!(err, ForgeError::Json(_)));
    }
}

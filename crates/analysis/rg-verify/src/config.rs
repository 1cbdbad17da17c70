//! Verifier configuration (`refgraph.toml`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Smallest useful loop iteration cap: one pass to seed, one to confirm.
const MIN_LOOP_ITERATIONS: usize = 2;

/// Tuning knobs of the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Maximum number of passes over a loop body before the fixed point is
    /// given up
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,

    /// Stop recording diagnostics for a function after this many
    #[serde(default)]
    pub error_limit: Option<usize>,

    /// Whether statements after a terminal statement are reported
    #[serde(default = "default_report_unreachable_code")]
    pub report_unreachable_code: bool,
}

fn default_max_loop_iterations() -> usize {
    8
}

fn default_report_unreachable_code() -> bool {
    true
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: default_max_loop_iterations(),
            error_limit: None,
            report_unreachable_code: default_report_unreachable_code(),
        }
    }
}

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has unexpected keys.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl VerifierConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(config.normalized())
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loop iteration cap with the lower bound applied.
    pub fn loop_iterations(&self) -> usize {
        self.max_loop_iterations.max(MIN_LOOP_ITERATIONS)
    }

    fn normalized(mut self) -> Self {
        self.max_loop_iterations = self.loop_iterations();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VerifierConfig::from_toml_str("").unwrap();
        assert_eq!(config, VerifierConfig::default());
        assert_eq!(config.max_loop_iterations, 8);
        assert!(config.report_unreachable_code);
        assert_eq!(config.error_limit, None);
    }

    #[test]
    fn test_iteration_cap_is_clamped() {
        let config = VerifierConfig::from_toml_str("max_loop_iterations = 0").unwrap();
        assert_eq!(config.max_loop_iterations, 2);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "error_limit = 3\nreport_unreachable_code = false").unwrap();
        let config = VerifierConfig::from_file(file.path()).unwrap();
        assert_eq!(config.error_limit, Some(3));
        assert!(!config.report_unreachable_code);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VerifierConfig::from_file(&dir.path().join("refgraph.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let err = VerifierConfig::from_toml_str("max_loop_iterations = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

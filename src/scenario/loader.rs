use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scenario::config::{ScenarioConfig, StepSpec};

/// Errors that can occur when loading a scenario file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read scenario file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Scenario validation failed: {message}")]
    ValidationError { message: String },
}

impl ScenarioConfig {
    /// Loads a scenario description from a TOML file.
    ///
    /// Reads, parses and validates; any failure carries the path so the
    /// caller can report which file was at fault.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: ScenarioConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the scenario description.
    ///
    /// Checks:
    /// - the shell command is non-empty
    /// - the default timeout is positive
    /// - there is at least one step
    /// - every regex pattern compiles
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shell.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "shell command must not be empty".to_string(),
            });
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "timeout_seconds must be positive".to_string(),
            });
        }

        if self.steps.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "scenario has no steps".to_string(),
            });
        }

        for (position, step) in self.steps.iter().enumerate() {
            if let StepSpec::Expect { expect, .. } = step {
                expect
                    .compile()
                    .map_err(|e| ConfigError::ValidationError {
                        message: format!("step {}: {e}", position + 1),
                    })?;
            }
        }

        Ok(())
    }
}

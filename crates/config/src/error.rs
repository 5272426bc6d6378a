//! Config errors

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed TOML in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot render config as TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Refused to save; holds every invalid field, `; `-separated
    #[error("Invalid config: {0}")]
    ValidationError(String),

    #[error("Cannot create {path}: {source}")]
    DirectoryCreationError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No config directory: {reason}")]
    PathResolutionError { reason: String },
}

/// One invalid field, named by its TOML path (`sources.bitrate`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {message}{}", found_suffix(.found))]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    /// Offending value as written
    pub found: Option<String>,
}

fn found_suffix(found: &Option<String>) -> String {
    found
        .as_ref()
        .map(|value| format!(" (found {value})"))
        .unwrap_or_default()
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            found: None,
        }
    }

    /// Attaches the offending value
    pub fn found(mut self, value: impl ToString) -> Self {
        self.found = Some(value.to_string());
        self
    }
}

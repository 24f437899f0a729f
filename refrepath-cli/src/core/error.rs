use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run before any scene file is touched, plus the
/// I/O and serialization failures the library surfaces to callers.
#[derive(Error, Debug)]
pub enum RefRepathError {
    #[error("Scan root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Scan root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error("Invalid rule parameter `{parameter}`: {message}")]
    InvalidRule {
        parameter: &'static str,
        message: String,
    },

    #[error("Invalid glob pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Host executable is not usable: {0}")]
    HostNotFound(String),

    #[error("Configuration error in {file}: {message}")]
    ConfigError { file: PathBuf, message: String },

    #[error("Missing worker argument: {0}")]
    MissingWorkerArgument(&'static str),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RefRepathError {
    pub fn invalid_rule(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            parameter,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RefRepathError>;

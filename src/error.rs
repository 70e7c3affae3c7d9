use crate::zone::ZoneError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unified error type for the build/check/deploy pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error("Malformed state file {path}: {reason}")]
    MalformedState { path: PathBuf, reason: String },

    #[error("No staged state at {0}, run build first")]
    MissingStagedState(PathBuf),

    #[error("Version control error: {0}")]
    Vcs(String),

    #[error("Failed to run {command}: {reason}")]
    ToolSpawn { command: String, reason: String },

    #[error("Deploy command failed: {0}")]
    DeployFailed(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Invalid command template for {option}: {reason}")]
    InvalidCommand { option: &'static str, reason: String },

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid zone name: {0}")]
    InvalidZoneName(String),

    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    #[error("Zones directory {0} is outside the working directory")]
    ZonesOutsideWorkdir(PathBuf),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

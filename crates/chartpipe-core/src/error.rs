//! Pipeline error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by pipeline stages
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Input rejected before any external call
    #[error("{message}")]
    Validation { message: String },

    /// The container backend could not be reached
    #[error("container backend unavailable: {message}")]
    EnvironmentUnavailable { message: String },

    /// A containerized tool exited with a non-zero status
    #[error("{tool} failed{}: {stderr}", exit_suffix(.code))]
    ToolFailed {
        tool: String,
        image: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Packaging output did not have the `<name>:<path>` shape
    #[error("malformed chart reference '{reference}': expected exactly one ':' separator, found {separators}")]
    MalformedReference { reference: String, separators: usize },

    /// The archive named by a chart reference is not on the host
    #[error("packaged chart not found: {}", .path.display())]
    ArtifactMissing { path: PathBuf },

    /// A host file could not be read or written
    #[error("cannot access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration file or value
    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

/// Broad classification of a [`PipelineError`], used for exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Environment,
    Tool,
    DataShape,
    Io,
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation { .. } => ErrorKind::Validation,
            PipelineError::EnvironmentUnavailable { .. } => ErrorKind::Environment,
            PipelineError::ToolFailed { .. } => ErrorKind::Tool,
            PipelineError::MalformedReference { .. } | PipelineError::ArtifactMissing { .. } => {
                ErrorKind::DataShape
            }
            PipelineError::FileAccess { .. }
            | PipelineError::Config { .. }
            | PipelineError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(e: serde_yaml::Error) -> Self {
        PipelineError::Config {
            message: e.to_string(),
        }
    }
}

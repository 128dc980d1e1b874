//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps pipeline errors to appropriate exit codes.

use chartpipe_core::{ErrorKind, PipelineError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Input rejected before anything ran
    #[error("Validation failed: {message}")]
    #[diagnostic(code(chartpipe::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Container backend unreachable
    #[error("Environment error: {message}")]
    #[diagnostic(
        code(chartpipe::cli::environment),
        help("Is the container engine running? Select another client with --container-cli.")
    )]
    Environment { message: String },

    /// A containerized tool failed
    #[error("{stage} failed: {message}")]
    #[diagnostic(code(chartpipe::cli::tool))]
    Tool {
        stage: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart reference or archive had an unexpected shape
    #[error("Chart reference error: {message}")]
    #[diagnostic(code(chartpipe::cli::reference))]
    Reference { message: String },

    /// IO or configuration error
    #[error("IO error: {message}")]
    #[diagnostic(code(chartpipe::cli::io))]
    Io { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(chartpipe::cli::cancelled))]
    Cancelled,

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartpipe::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Environment { .. } => exit_codes::ENVIRONMENT_ERROR,
            CliError::Tool { .. } => exit_codes::TOOL_ERROR,
            CliError::Reference { .. } => exit_codes::REFERENCE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach the name of the stage that produced a pipeline error
    pub fn from_stage(stage: &str, err: PipelineError) -> Self {
        if let PipelineError::ToolFailed { tool, image, .. } = &err {
            return Self::Tool {
                stage: stage.to_string(),
                help: Some(format!("{} ran in image {}", tool, image)),
                message: err.to_string(),
            };
        }
        Self::from(err)
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => CliError::Validation {
                message,
                help: None,
            },
            ErrorKind::Environment => CliError::Environment { message },
            ErrorKind::Tool => CliError::Tool {
                stage: "pipeline".to_string(),
                message,
                help: None,
            },
            ErrorKind::DataShape => CliError::Reference { message },
            ErrorKind::Io => CliError::Io { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let cases = [
            (PipelineError::validation("empty tag"), exit_codes::VALIDATION_ERROR),
            (
                PipelineError::EnvironmentUnavailable {
                    message: "no docker".to_string(),
                },
                exit_codes::ENVIRONMENT_ERROR,
            ),
            (
                PipelineError::MalformedReference {
                    reference: "x".to_string(),
                    separators: 0,
                },
                exit_codes::REFERENCE_ERROR,
            ),
            (PipelineError::config("bad"), exit_codes::IO_ERROR),
        ];

        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn test_interrupt_exit_code() {
        assert_eq!(CliError::Cancelled.exit_code(), exit_codes::CANCELLED);
        assert_eq!(CliError::Cancelled.to_string(), "Interrupted");
    }

    #[test]
    fn test_tool_error_names_stage() {
        let err = CliError::from_stage(
            "publish",
            PipelineError::ToolFailed {
                tool: "helm".to_string(),
                image: "alpine/helm:3.12.1".to_string(),
                code: Some(1),
                stderr: "Error: unauthorized".to_string(),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::TOOL_ERROR);
        insta::assert_snapshot!(
            err.to_string(),
            @"publish failed: helm failed with exit code 1: Error: unauthorized"
        );
    }
}

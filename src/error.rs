//! Error types shared by the executor, the repo parser and the steps

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while checking or preparing a host
#[derive(Debug, Error)]
pub enum MaintainError {
    /// A command that was expected to succeed exited non-zero
    #[error("{command} exited with status {exit_status}: {output}")]
    CommandExecution {
        command: String,
        exit_status: i32,
        output: String,
    },

    /// A repository definition file is malformed
    #[error("{reason} ({})", path.display())]
    ConfigSyntax { path: PathBuf, reason: String },

    /// A check's expectation was not met
    #[error("{0}")]
    StepAssertion(String),

    /// An invalid or unsupported action was requested
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaintainError>;

impl MaintainError {
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::StepAssertion(msg.into())
    }

    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub fn config_syntax(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigSyntax {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

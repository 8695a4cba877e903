// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ProxError`] covers everything that can stop a `prox` invocation.
//! - [`RunError`] is what a [`ProcessRunner`](crate::exec::ProcessRunner)
//!   reports for a single process; the supervisor turns it into a
//!   [`RunStatus`](crate::exec::RunStatus).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse env file: {0}")]
    EnvFile(String),

    #[error("Failed to parse process file: {0}")]
    ProcessFile(String),

    #[error("Missing arguments: {0}")]
    MissingArgs(String),

    #[error("Process '{name}' failed: {source}")]
    ProcessFailed {
        name: String,
        #[source]
        source: RunError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProxError {
    /// Exit code used by the `prox` binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProxError::EnvFile(_) => 2,
            ProxError::ProcessFile(_) | ProxError::Yaml(_) => 3,
            ProxError::MissingArgs(_) => 4,
            _ => 1,
        }
    }
}

/// Why a single process did not complete successfully.
#[derive(Error, Debug)]
pub enum RunError {
    /// The process could not be started at all.
    #[error("failed to launch: {0}")]
    Launch(String),

    /// The process ran and exited with a non-zero code.
    #[error("exited with code {code}")]
    Exited { code: i32 },

    /// The process was killed by a signal it did not ask for.
    #[error("terminated by signal")]
    Terminated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The execution unit died without reporting a result.
    #[error("execution unit panicked")]
    Panicked,

    /// The run was cancelled before the process finished on its own.
    #[error("interrupted")]
    Interrupted,
}

impl RunError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, RunError::Interrupted)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProxError>;

// src/exec/runner.rs

//! Pluggable process runner abstraction.
//!
//! The supervisor never touches the operating system itself. It hands each
//! process to a `ProcessRunner`, which blocks (asynchronously) until the
//! process is done or the cancellation token fires.
//!
//! - [`ShellRunner`](super::ShellRunner) is the implementation used by the
//!   `prox` binary.
//! - Tests provide their own runners that simulate success, failure and
//!   cancellation without spawning anything.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::config::ProcessDefinition;
use crate::errors::RunError;
use crate::output::OutputWriter;

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>>;

/// Runs one process definition to completion.
pub trait ProcessRunner: Send + Sync {
    /// Run `process` until it exits or `cancel` fires.
    ///
    /// Implementations must return [`RunError::Interrupted`] when they stop
    /// because of `cancel`; any other error counts as a failure of the run.
    /// `log` is the span named after this process.
    fn run<'a>(
        &'a self,
        process: &'a ProcessDefinition,
        cancel: CancellationToken,
        output: OutputWriter,
        log: Span,
    ) -> RunFuture<'a>;
}

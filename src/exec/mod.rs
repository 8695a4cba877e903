// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runner`] defines the `ProcessRunner` trait the supervisor talks to.
//! - [`shell`] contains `ShellRunner`, which spawns real processes with
//!   `tokio::process::Command`.
//! - [`supervisor`] launches one execution unit per process, drains their
//!   completion messages and cancels the group on the first failure.

pub mod runner;
pub mod shell;
pub mod supervisor;

pub use runner::{ProcessRunner, RunFuture};
pub use shell::{DEFAULT_KILL_TIMEOUT, ShellRunner};
pub use supervisor::{Completion, ProcessId, RunReport, RunStatus, Supervisor};

// src/exec/supervisor.rs

//! Fan-out / fan-in supervision of one batch of processes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, info_span};

use crate::config::ProcessDefinition;
use crate::errors::{ProxError, Result, RunError};
use crate::exec::runner::ProcessRunner;
use crate::output::{Output, padding_width};

/// Run-scoped identifier of a launched process (its launch index).
///
/// Bookkeeping uses this rather than the name, so duplicate names stay
/// distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

/// Terminal classification of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Error,
    Interrupted,
}

impl RunStatus {
    pub fn from_result(result: &std::result::Result<(), RunError>) -> Self {
        match result {
            Ok(()) => RunStatus::Success,
            Err(RunError::Interrupted) => RunStatus::Interrupted,
            Err(_) => RunStatus::Error,
        }
    }
}

/// Sent exactly once per launched process.
#[derive(Debug)]
pub struct Completion {
    pub id: ProcessId,
    pub name: String,
    pub status: RunStatus,
    pub error: Option<RunError>,
}

/// Everything observed during one [`Supervisor::run_with_report`] call.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Completions in arrival order.
    pub completions: Vec<Completion>,
    /// True when the caller's token was cancelled during the run.
    pub caller_cancelled: bool,
    first_failure: Option<usize>,
}

impl RunReport {
    /// The first completion with status `Error`.
    pub fn first_failure(&self) -> Option<&Completion> {
        self.first_failure.map(|idx| &self.completions[idx])
    }

    pub fn count(&self, status: RunStatus) -> usize {
        self.completions
            .iter()
            .filter(|c| c.status == status)
            .count()
    }

    /// Status of the first completion reported under `name`.
    pub fn status_of(&self, name: &str) -> Option<RunStatus> {
        self.completions
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.status)
    }

    /// `Err` with the first failure, `Ok` otherwise (including a clean
    /// caller-initiated interrupt).
    pub fn into_result(mut self) -> Result<()> {
        let Some(idx) = self.first_failure else {
            return Ok(());
        };

        let failed = self.completions.swap_remove(idx);
        Err(ProxError::ProcessFailed {
            name: failed.name,
            source: failed.error.unwrap_or(RunError::Panicked),
        })
    }
}

/// Owns the lifecycle of all processes of one run.
pub struct Supervisor {
    runner: Arc<dyn ProcessRunner>,
    output: Output,
    log: Span,
}

impl Supervisor {
    /// `log` is the parent span for every event of the supervisor and for
    /// the per-process spans handed to the runner.
    pub fn new(runner: Arc<dyn ProcessRunner>, output: Output, log: Span) -> Self {
        Self {
            runner,
            output,
            log,
        }
    }

    /// Start all processes and block until every one of them has completed.
    ///
    /// The first process that fails cancels all others; its error is
    /// returned once the rest have shut down.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        processes: &[ProcessDefinition],
    ) -> Result<()> {
        self.run_with_report(cancel, processes).await.into_result()
    }

    pub async fn run_with_report(
        &self,
        cancel: &CancellationToken,
        processes: &[ProcessDefinition],
    ) -> RunReport {
        let mut report = RunReport::default();
        if processes.is_empty() {
            info!(parent: &self.log, "no processes to start");
            return report;
        }

        info!(parent: &self.log, amount = processes.len(), "starting processes");

        let group = cancel.child_token();
        let padding = padding_width(processes);
        let (tx, mut rx) = mpsc::channel::<Completion>(processes.len());
        let mut running: HashMap<ProcessId, String> = HashMap::new();
        let mut units = JoinSet::new();

        for (idx, process) in processes.iter().enumerate() {
            let id = ProcessId(idx);
            running.insert(id, process.name.clone());
            units.spawn(self.execution_unit(id, process, padding, group.clone(), tx.clone()));
        }
        drop(tx);

        self.wait_for_all(&mut rx, &mut running, &group, &mut report)
            .await;

        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                error!(parent: &self.log, error = %e, "execution unit did not finish cleanly");
            }
        }

        report.caller_cancelled = cancel.is_cancelled();
        if report.caller_cancelled && report.first_failure.is_none() {
            info!(parent: &self.log, "run interrupted by caller");
        }

        report
    }

    fn execution_unit(
        &self,
        id: ProcessId,
        process: &ProcessDefinition,
        padding: usize,
        cancel: CancellationToken,
        tx: mpsc::Sender<Completion>,
    ) -> impl Future<Output = ()> + Send + use<> {
        let runner = Arc::clone(&self.runner);
        let output = self.output.next(process, padding);
        let span = info_span!(parent: &self.log, "process", name = %process.name);
        let log = self.log.clone();
        let process = process.clone();

        async move {
            let name = process.name.clone();
            info!(parent: &log, name = %name, "starting process");

            // The runner gets its own task so a panic inside it still ends in
            // a completion message.
            let inner = tokio::spawn(async move {
                runner.run(&process, cancel, output, span).await
            });
            let result = match inner.await {
                Ok(result) => result,
                Err(e) => {
                    error!(parent: &log, name = %name, error = %e, "process runner panicked");
                    Err(RunError::Panicked)
                }
            };

            let status = RunStatus::from_result(&result);
            let completion = Completion {
                id,
                name,
                status,
                error: result.err(),
            };
            if tx.send(completion).await.is_err() {
                debug!(parent: &log, "completion receiver dropped");
            }
        }
    }

    async fn wait_for_all(
        &self,
        rx: &mut mpsc::Receiver<Completion>,
        running: &mut HashMap<ProcessId, String>,
        group: &CancellationToken,
        report: &mut RunReport,
    ) {
        while !running.is_empty() {
            debug!(parent: &self.log, amount = running.len(), "waiting for processes to complete");

            let Some(completion) = rx.recv().await else {
                error!(parent: &self.log, amount = running.len(), "completion channel closed early");
                self.record_lost(running, group, report);
                return;
            };

            running.remove(&completion.id);
            self.record(completion, group, report);
        }
    }

    fn record(&self, completion: Completion, group: &CancellationToken, report: &mut RunReport) {
        match completion.status {
            RunStatus::Success => {
                info!(parent: &self.log, name = %completion.name, "process finished successfully");
            }
            RunStatus::Interrupted => {
                info!(parent: &self.log, name = %completion.name, "process was interrupted");
            }
            RunStatus::Error => {
                let reason = completion
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                error!(parent: &self.log, name = %completion.name, error = %reason, "process failed");

                if report.first_failure.is_none() {
                    report.first_failure = Some(report.completions.len());
                }
                group.cancel();
            }
        }

        report.completions.push(completion);
    }

    /// Record every process that never reported back as failed.
    fn record_lost(
        &self,
        running: &mut HashMap<ProcessId, String>,
        group: &CancellationToken,
        report: &mut RunReport,
    ) {
        let mut lost: Vec<_> = running.drain().collect();
        lost.sort_by_key(|(id, _)| *id);

        for (id, name) in lost {
            let completion = Completion {
                id,
                name,
                status: RunStatus::Error,
                error: Some(RunError::Panicked),
            };
            self.record(completion, group, report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(RunStatus::from_result(&Ok(())), RunStatus::Success);
        assert_eq!(
            RunStatus::from_result(&Err(RunError::Interrupted)),
            RunStatus::Interrupted
        );
        assert_eq!(
            RunStatus::from_result(&Err(RunError::Exited { code: 1 })),
            RunStatus::Error
        );
        assert_eq!(
            RunStatus::from_result(&Err(RunError::Launch("nope".into()))),
            RunStatus::Error
        );
    }

    #[test]
    fn report_returns_first_failure() {
        let mut report = RunReport::default();
        let group = CancellationToken::new();
        let sup = Supervisor::new(
            Arc::new(NeverRuns),
            Output::new(std::io::sink(), false),
            Span::none(),
        );

        for (idx, (name, status, error)) in [
            ("a", RunStatus::Success, None),
            ("b", RunStatus::Error, Some(RunError::Exited { code: 3 })),
            ("c", RunStatus::Error, Some(RunError::Exited { code: 4 })),
        ]
        .into_iter()
        .enumerate()
        {
            sup.record(
                Completion {
                    id: ProcessId(idx),
                    name: name.into(),
                    status,
                    error,
                },
                &group,
                &mut report,
            );
        }

        assert!(group.is_cancelled());
        assert_eq!(report.first_failure().map(|c| c.name.as_str()), Some("b"));
        match report.into_result() {
            Err(ProxError::ProcessFailed { name, source }) => {
                assert_eq!(name, "b");
                assert!(matches!(source, RunError::Exited { code: 3 }));
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    struct NeverRuns;

    impl ProcessRunner for NeverRuns {
        fn run<'a>(
            &'a self,
            _process: &'a ProcessDefinition,
            _cancel: CancellationToken,
            _output: crate::output::OutputWriter,
            _log: Span,
        ) -> crate::exec::runner::RunFuture<'a> {
            Box::pin(async { Ok::<(), RunError>(()) })
        }
    }
}

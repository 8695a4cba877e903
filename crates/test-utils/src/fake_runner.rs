use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use prox::config::ProcessDefinition;
use prox::errors::RunError;
use prox::exec::{ProcessRunner, RunFuture};
use prox::output::OutputWriter;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, info};

/// What a fake process does when run.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Return success immediately.
    Succeed,
    /// Return success after a delay, unless cancelled first.
    SucceedAfter(Duration),
    /// Exit with `code` after `delay`, unless cancelled first.
    FailAfter { delay: Duration, code: i32 },
    /// Fail to start.
    LaunchError(String),
    /// Block until cancelled, then report `Interrupted`.
    RunUntilCancelled,
    /// Exit with `code` once cancelled, like a process that treats SIGINT
    /// as a failure.
    FailOnCancel { code: i32 },
    /// Take `grace` to shut down once cancelled.
    SlowShutdown { grace: Duration },
    /// Write the lines, then succeed.
    Emit(Vec<String>),
    Panic,
}

/// A fake runner that:
/// - records which processes were started, in start order
/// - plays back a scripted [`Behaviour`] per process name.
#[derive(Clone)]
pub struct FakeRunner {
    behaviours: HashMap<String, Behaviour>,
    default: Behaviour,
    started: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    /// Every process not configured otherwise behaves like `default`.
    pub fn new(default: Behaviour) -> Self {
        Self {
            behaviours: HashMap::new(),
            default,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with(mut self, name: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(name.to_string(), behaviour);
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    fn behaviour_for(&self, name: &str) -> Behaviour {
        self.behaviours
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        process: &'a ProcessDefinition,
        cancel: CancellationToken,
        output: OutputWriter,
        log: Span,
    ) -> RunFuture<'a> {
        self.started.lock().unwrap().push(process.name.clone());
        let behaviour = self.behaviour_for(&process.name);

        Box::pin(
            async move {
                info!(?behaviour, "fake process running");
                match behaviour {
                    Behaviour::Succeed => Ok(()),
                    Behaviour::SucceedAfter(delay) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => Ok(()),
                            _ = cancel.cancelled() => Err(RunError::Interrupted),
                        }
                    }
                    Behaviour::FailAfter { delay, code } => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => Err(RunError::Exited { code }),
                            _ = cancel.cancelled() => Err(RunError::Interrupted),
                        }
                    }
                    Behaviour::LaunchError(reason) => Err(RunError::Launch(reason)),
                    Behaviour::RunUntilCancelled => {
                        cancel.cancelled().await;
                        Err(RunError::Interrupted)
                    }
                    Behaviour::FailOnCancel { code } => {
                        cancel.cancelled().await;
                        Err(RunError::Exited { code })
                    }
                    Behaviour::SlowShutdown { grace } => {
                        cancel.cancelled().await;
                        tokio::time::sleep(grace).await;
                        Err(RunError::Interrupted)
                    }
                    Behaviour::Emit(lines) => {
                        for line in lines {
                            output.write_line(&line)?;
                        }
                        Ok(())
                    }
                    Behaviour::Panic => panic!("fake process panicked"),
                }
            }
            .instrument(log),
        )
    }
}

// src/exec/shell.rs

//! Runs process scripts through the system shell.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use crate::config::ProcessDefinition;
use crate::errors::RunError;
use crate::exec::runner::{ProcessRunner, RunFuture};
use crate::output::OutputWriter;

pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(10);

/// How long output is still forwarded after the shell itself has exited.
/// Background children holding the pipes open are killed afterwards.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// [`ProcessRunner`] that executes `sh -c <script>` (`cmd /C` on Windows).
///
/// - stdout and stderr are forwarded line by line to the process's
///   [`OutputWriter`].
/// - On cancellation the child's process group receives SIGINT. If it has not
///   exited after `kill_timeout`, it is killed.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    kill_timeout: Duration,
}

impl ShellRunner {
    pub fn new(kill_timeout: Duration) -> Self {
        Self { kill_timeout }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_TIMEOUT)
    }
}

impl ProcessRunner for ShellRunner {
    fn run<'a>(
        &'a self,
        process: &'a ProcessDefinition,
        cancel: CancellationToken,
        output: OutputWriter,
        log: Span,
    ) -> RunFuture<'a> {
        Box::pin(self.run_inner(process, cancel, output, log.clone()).instrument(log))
    }
}

impl ShellRunner {
    async fn run_inner(
        &self,
        process: &ProcessDefinition,
        cancel: CancellationToken,
        output: OutputWriter,
        log: Span,
    ) -> Result<(), RunError> {
        info!(cmd = %process.script, "spawning process");

        let mut cmd = shell_command(&process.script);
        cmd.envs(process.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a terminal Ctrl-C does not reach the children
        // directly, they are interrupted through `cancel`.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| RunError::Launch(format!("{}: {e}", process.script)))?;
        // `Child::id` is gone once the child has been reaped; the group id is
        // still needed to clean up after it.
        let pgid = child.id();

        let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(spawn_pump(stdout, output.clone(), log.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(spawn_pump(stderr, output, log));
        }

        let exited = tokio::select! {
            status = child.wait() => Some(status?),
            _ = cancel.cancelled() => None,
        };

        let result = match exited {
            Some(status) => {
                info!(exit_code = ?status.code(), success = status.success(), "process exited");
                exit_result(status)
            }
            None => {
                self.shutdown(&mut child, pgid).await;
                Err(RunError::Interrupted)
            }
        };

        drain(pumps, pgid).await;

        result
    }

    async fn shutdown(&self, child: &mut Child, pgid: Option<u32>) {
        info!("cancellation requested; interrupting process");
        interrupt(child, pgid);

        match tokio::time::timeout(self.kill_timeout, child.wait()).await {
            Ok(Ok(status)) => debug!(exit_code = ?status.code(), "process exited after interrupt"),
            Ok(Err(e)) => warn!(error = %e, "failed to wait for interrupted process"),
            Err(_) => {
                warn!(
                    timeout_secs = self.kill_timeout.as_secs_f64(),
                    "process did not exit after interrupt; killing"
                );
                force_kill(child, pgid).await;
            }
        }
    }
}

fn shell_command(script: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    }
}

fn exit_result(status: ExitStatus) -> Result<(), RunError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(RunError::Exited { code }),
        None => Err(RunError::Terminated),
    }
}

/// Wait for the output pumps, at most [`DRAIN_TIMEOUT`].
///
/// A background child of the script keeps the pipes open after the shell
/// exits. Such leftovers are killed with the rest of the process group and
/// the pumps are dropped.
async fn drain(mut pumps: Vec<JoinHandle<()>>, pgid: Option<u32>) {
    let finished = async {
        for pump in pumps.iter_mut() {
            if let Err(e) = pump.await {
                debug!(error = %e, "output pump did not finish cleanly");
            }
        }
    };

    if tokio::time::timeout(DRAIN_TIMEOUT, finished).await.is_ok() {
        return;
    }

    debug!("output still open after process exit; killing leftover processes");
    kill_group(pgid);
    for pump in &pumps {
        pump.abort();
    }
}

/// Forward every line of `reader` to `output`. Invalid UTF-8 is replaced
/// rather than ending the stream.
fn spawn_pump<R>(reader: R, output: OutputWriter, log: Span) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(
        async move {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']);
                        if let Err(e) = output.write_line(line) {
                            warn!(error = %e, "failed to write process output");
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "output stream closed with error");
                        break;
                    }
                }
            }
        }
        .instrument(log),
    )
}

#[cfg(unix)]
fn signal_group(pgid: Option<u32>, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Some(pid) = pgid else { return };
    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) => {}
        // The whole group has already exited.
        Err(Errno::ESRCH) => debug!(pid, ?signal, "process group already gone"),
        Err(e) => warn!(pid, ?signal, error = %e, "failed to signal process group"),
    }
}

#[cfg(unix)]
fn interrupt(_child: &mut Child, pgid: Option<u32>) {
    signal_group(pgid, nix::sys::signal::Signal::SIGINT);
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child, _pgid: Option<u32>) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to stop process");
    }
}

#[cfg(unix)]
fn kill_group(pgid: Option<u32>) {
    signal_group(pgid, nix::sys::signal::Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_group(_pgid: Option<u32>) {}

async fn force_kill(child: &mut Child, pgid: Option<u32>) {
    kill_group(pgid);

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill process");
    }
}

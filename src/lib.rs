// src/lib.rs

pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod output;
pub mod types;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span};

use crate::cli::{CliArgs, Command, FileArgs, ShowArgs, StartArgs};
use crate::config::{ProcessDefinition, discover_and_load, load_environment};
use crate::errors::{ProxError, Result};
use crate::exec::{ShellRunner, Supervisor};
use crate::output::Output;

/// High-level entry point used by `main.rs`.
///
/// `start` wires together:
/// - env file + process file loading
/// - the shell runner and the console output
/// - the supervisor
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command() {
        Command::Start(start) => start_processes(start).await,
        Command::Show(show) => {
            let processes = load_processes(&show.files)?;
            print!("{}", render_show(&show, args.verbose, &processes)?);
            Ok(())
        }
    }
}

async fn start_processes(args: StartArgs) -> Result<()> {
    let processes = load_processes(&args.files)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("received shutdown signal; interrupting all processes");
            cancel.cancel();
        });
    }

    let colors = !args.no_color && std::io::stdout().is_terminal();
    let runner = ShellRunner::new(Duration::from_secs(args.kill_timeout));
    let supervisor = Supervisor::new(Arc::new(runner), Output::stdout(colors), info_span!("prox"));

    supervisor.run(&cancel, &processes).await
}

fn load_processes(files: &FileArgs) -> Result<Vec<ProcessDefinition>> {
    let env = load_environment(&files.env)?;
    let cwd = std::env::current_dir()?;
    let processes = discover_and_load(&cwd, files.procfile.as_deref(), &env)?;
    debug!(amount = processes.len(), "loaded process definitions");
    Ok(processes)
}

/// Text printed by `prox show`.
///
/// - `--all`: a `NAME  SCRIPT` table of every process.
/// - a name: the process's command line, or its full definition as JSON
///   when `verbose` is set.
pub fn render_show(
    args: &ShowArgs,
    verbose: bool,
    processes: &[ProcessDefinition],
) -> Result<String> {
    if args.all {
        let width = processes
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0)
            .max("NAME".len());

        let mut out = format!("{:<width$}  SCRIPT\n", "NAME");
        for p in processes {
            out.push_str(&format!("{:<width$}  {}\n", p.name(), p.command_line()));
        }
        return Ok(out);
    }

    let name = args.name.as_deref().ok_or_else(|| {
        ProxError::MissingArgs(
            "prox show requires exactly one argument - the process name as written in the Procfile or Proxfile"
                .to_string(),
        )
    })?;

    let process = processes.iter().find(|p| p.name == name).ok_or_else(|| {
        ProxError::Config(format!(
            "no such process {name:?}. Use `prox show --all` to see a list of all available processes"
        ))
    })?;

    if verbose {
        let json = serde_json::to_string_pretty(process).map_err(anyhow::Error::from)?;
        Ok(format!("{json}\n"))
    } else {
        Ok(format!("{}\n", process.command_line()))
    }
}

/// Resolves on Ctrl-C, and on unix also on SIGTERM or SIGHUP.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(mut term), Ok(mut hup)) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                    _ = hup.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to install signal handlers; only Ctrl-C is handled");
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
        // Never resolve: without a signal source nothing can request shutdown.
        std::future::pending::<()>().await;
    }
}

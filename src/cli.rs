// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::exec::DEFAULT_KILL_TIMEOUT;

/// Command-line arguments for `prox`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "prox",
    version,
    about = "A process runner for Procfile-based applications.",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Flags for the default `start` command.
    #[command(flatten)]
    pub start: StartArgs,

    /// Enable detailed log output for debugging (same as `--log-level debug`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `PROX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// The command to run; `start` when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Start(self.start.clone()))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run all processes (default).
    Start(StartArgs),
    /// Show the run configuration of a single process.
    Show(ShowArgs),
}

/// Where processes and environment come from.
#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    /// Path to the env file.
    #[arg(short, long, value_name = "PATH", default_value = ".env")]
    pub env: PathBuf,

    /// Path to the Proxfile or Procfile (default: "Proxfile" or "Procfile").
    #[arg(short = 'f', long, value_name = "PATH")]
    pub procfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub files: FileArgs,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Seconds to wait for an interrupted process before killing it.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_KILL_TIMEOUT.as_secs())]
    pub kill_timeout: u64,
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Process name as written in the Proxfile or Procfile.
    pub name: Option<String>,

    /// Show the run configuration of all processes (ignoring any name).
    #[arg(short, long)]
    pub all: bool,

    #[command(flatten)]
    pub files: FileArgs,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_start_with_top_level_flags() {
        let args = CliArgs::try_parse_from(["prox", "-f", "Procfile.dev", "--no-color"]).unwrap();
        match args.command() {
            Command::Start(start) => {
                assert_eq!(start.files.procfile, Some(PathBuf::from("Procfile.dev")));
                assert_eq!(start.files.env, PathBuf::from(".env"));
                assert!(start.no_color);
                assert_eq!(start.kill_timeout, 10);
            }
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[test]
    fn show_accepts_name_and_global_verbose() {
        let args = CliArgs::try_parse_from(["prox", "show", "web", "-v"]).unwrap();
        assert!(args.verbose);
        match args.command() {
            Command::Show(show) => {
                assert_eq!(show.name.as_deref(), Some("web"));
                assert!(!show.all);
            }
            other => panic!("expected show, got {other:?}"),
        }
    }
}

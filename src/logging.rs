// src/logging.rs

//! Logging setup for `prox` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--verbose` (debug)
//! 3. `PROX_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that STDOUT carries only process output.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, verbose: bool) -> Result<()> {
    let filter = resolve_filter(cli_level, verbose, std::env::var("PROX_LOG").ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

/// `PROX_LOG` accepts full `EnvFilter` directives such as `prox=debug`.
/// An unparsable value falls back to `info`.
fn resolve_filter(cli_level: Option<LogLevel>, verbose: bool, env: Option<&str>) -> EnvFilter {
    if let Some(level) = explicit_level(cli_level, verbose) {
        return EnvFilter::new(level.as_str().to_lowercase());
    }

    env.filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn explicit_level(cli_level: Option<LogLevel>, verbose: bool) -> Option<tracing::Level> {
    match cli_level {
        Some(lvl) => Some(level_from_log_level(lvl)),
        None if verbose => Some(tracing::Level::DEBUG),
        None => None,
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    fn max_level(cli: Option<LogLevel>, verbose: bool, env: Option<&str>) -> Option<LevelFilter> {
        resolve_filter(cli, verbose, env).max_level_hint()
    }

    #[test]
    fn flag_beats_verbose_beats_env() {
        assert_eq!(max_level(Some(LogLevel::Warn), true, Some("trace")), Some(LevelFilter::WARN));
        assert_eq!(max_level(None, true, Some("error")), Some(LevelFilter::DEBUG));
        assert_eq!(max_level(None, false, Some("error")), Some(LevelFilter::ERROR));
        assert_eq!(max_level(None, false, None), Some(LevelFilter::INFO));
    }

    #[test]
    fn env_accepts_target_directives() {
        let filter = resolve_filter(None, false, Some("prox=debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        assert!(filter.to_string().contains("prox=debug"));
    }
}

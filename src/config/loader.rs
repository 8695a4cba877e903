// src/config/loader.rs

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ProcessDefinition, RawProxfile};
use crate::config::procfile::parse_procfile;
use crate::config::validate::{processes_from_procfile, processes_from_proxfile};
use crate::env::Environment;
use crate::errors::{ProxError, Result};

/// Which parser a process file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFileKind {
    Proxfile,
    Procfile,
}

impl ProcessFileKind {
    /// Files whose name starts with `Procfile` (e.g. `Procfile.dev`) are
    /// Procfiles; everything else is read as a Proxfile.
    pub fn for_path(path: &Path) -> Self {
        let is_procfile = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("Procfile"));

        if is_procfile {
            ProcessFileKind::Procfile
        } else {
            ProcessFileKind::Proxfile
        }
    }
}

/// Decide which process file to read.
///
/// - An explicit path is used as-is.
/// - Otherwise `Proxfile` in `dir` is preferred, then `Procfile`.
pub fn resolve_process_file(
    dir: &Path,
    explicit: Option<&Path>,
) -> Result<(PathBuf, ProcessFileKind)> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "reading processes from file given via --procfile");
        return Ok((path.to_path_buf(), ProcessFileKind::for_path(path)));
    }

    let proxfile = dir.join("Proxfile");
    if proxfile.is_file() {
        debug!("reading processes from Proxfile");
        return Ok((proxfile, ProcessFileKind::Proxfile));
    }

    let procfile = dir.join("Procfile");
    if procfile.is_file() {
        debug!("reading processes from Procfile");
        return Ok((procfile, ProcessFileKind::Procfile));
    }

    Err(ProxError::ProcessFile(
        "no Proxfile or Procfile found. Please specify a path with --procfile".to_string(),
    ))
}

/// Load and validate the processes of a single file.
pub fn load_processes(
    path: &Path,
    kind: ProcessFileKind,
    env: &Environment,
) -> Result<Vec<ProcessDefinition>> {
    let file = File::open(path).map_err(|e| {
        ProxError::ProcessFile(format!("failed to open {}: {e}", path.display()))
    })?;

    match kind {
        ProcessFileKind::Proxfile => {
            let raw: RawProxfile = serde_yaml::from_reader(file)?;
            processes_from_proxfile(raw, env)
        }
        ProcessFileKind::Procfile => {
            let entries = parse_procfile(BufReader::new(file))?;
            processes_from_procfile(entries, env)
        }
    }
}

/// Discover the process file in `dir` (or use `explicit`) and load it.
pub fn discover_and_load(
    dir: &Path,
    explicit: Option<&Path>,
    env: &Environment,
) -> Result<Vec<ProcessDefinition>> {
    let (path, kind) = resolve_process_file(dir, explicit)?;
    load_processes(&path, kind, env)
}

/// Build the global environment: the system environment overlaid with the
/// env file at `path`. A missing env file is not an error.
pub fn load_environment(path: &Path) -> Result<Environment> {
    if path.as_os_str().is_empty() {
        return Err(ProxError::EnvFile("env file path cannot be empty".to_string()));
    }

    let mut env = Environment::from_system();

    if !path.exists() {
        debug!(path = %path.display(), "did not find env file; using system env instead");
        return Ok(env);
    }

    debug!(path = %path.display(), "reading env file");
    let contents = fs::read_to_string(path)
        .map_err(|e| ProxError::EnvFile(format!("failed to open env file: {e}")))?;
    env.parse_env_file(&contents)?;

    Ok(env)
}

// src/config/procfile.rs

//! Procfile parsing: one `name: command` entry per line.

use std::io::BufRead;

use crate::errors::{ProxError, Result};

/// A single `name: command` line from a Procfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcfileEntry {
    pub name: String,
    pub script: String,
}

/// Read all entries of a Procfile.
///
/// Blank lines and lines starting with `#` are skipped. Any other line must
/// contain a `:` with a non-empty name before it and a non-empty command after
/// it. Names must be unique.
pub fn parse_procfile(reader: impl BufRead) -> Result<Vec<ProcfileEntry>> {
    let mut entries: Vec<ProcfileEntry> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let lineno = idx + 1;
        let (name, script) = trimmed.split_once(':').ok_or_else(|| {
            ProxError::ProcessFile(format!(
                "Procfile line {lineno}: expected \"name: command\", got {trimmed:?}"
            ))
        })?;

        let name = name.trim();
        let script = script.trim();
        if name.is_empty() {
            return Err(ProxError::ProcessFile(format!(
                "Procfile line {lineno}: process name is empty"
            )));
        }
        if script.is_empty() {
            return Err(ProxError::ProcessFile(format!(
                "Procfile line {lineno}: process '{name}' has no command"
            )));
        }
        if entries.iter().any(|e| e.name == name) {
            return Err(ProxError::ProcessFile(format!(
                "Procfile line {lineno}: duplicate process name '{name}'"
            )));
        }

        entries.push(ProcfileEntry {
            name: name.to_string(),
            script: script.to_string(),
        });
    }

    Ok(entries)
}

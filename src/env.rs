// src/env.rs

//! Ordered process environment.
//!
//! An [`Environment`] keeps variables in insertion order with unique keys.
//! Setting a key that already exists replaces its value in place, so the
//! order stays stable when an env file or a process overrides a variable.

use serde::Serialize;

use crate::errors::{ProxError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the environment of the current process.
    pub fn from_system() -> Self {
        let mut env = Self::new();
        for (key, value) in std::env::vars() {
            env.set(key, value);
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    /// Apply a list of `KEY=VALUE` entries.
    ///
    /// Entries without `=` set the key to an empty value.
    pub fn set_all<S: AsRef<str>>(&mut self, entries: &[S]) {
        for entry in entries {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((key, value)) => self.set(key.trim(), value),
                None => self.set(entry.trim(), ""),
            }
        }
    }

    /// Overlay the variables of an env file onto this environment.
    ///
    /// The file uses dotenv syntax: `KEY=VALUE` lines, `#` comments, an
    /// optional `export ` prefix, quoted values with escapes, and multi-line
    /// double-quoted values.
    pub fn parse_env_file(&mut self, contents: &str) -> Result<()> {
        for item in dotenvy::from_read_iter(contents.as_bytes()) {
            let (key, value) = item.map_err(|e| env_file_error(contents, e))?;
            self.set(key, value);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn env_file_error(contents: &str, err: dotenvy::Error) -> ProxError {
    match err {
        dotenvy::Error::LineParse(line, _) => {
            let first = line.lines().next().unwrap_or_default().trim();
            match contents.lines().position(|l| l.trim() == first) {
                Some(idx) => ProxError::EnvFile(format!("line {}: cannot parse {first:?}", idx + 1)),
                None => ProxError::EnvFile(format!("cannot parse {first:?}")),
            }
        }
        other => ProxError::EnvFile(other.to_string()),
    }
}

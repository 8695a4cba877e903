// src/config/mod.rs

//! Process-file loading and validation for prox.
//!
//! Responsibilities:
//! - Define the YAML-backed Proxfile model and the resolved
//!   [`ProcessDefinition`] (`model.rs`).
//! - Parse Procfiles (`procfile.rs`).
//! - Discover and load process and env files from disk (`loader.rs`).
//! - Apply defaults and validate patterns, colors and formats (`validate.rs`).

pub mod loader;
pub mod model;
pub mod procfile;
pub mod validate;

pub use loader::{
    ProcessFileKind, discover_and_load, load_environment, load_processes, resolve_process_file,
};
pub use model::{
    ProcessDefinition, RawProcess, RawProcessEntry, RawProxfile, StructuredOutputConfig,
    TaggingRule, ValuePattern,
};
pub use procfile::{ProcfileEntry, parse_procfile};
pub use validate::{processes_from_procfile, processes_from_proxfile};

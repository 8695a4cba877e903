// src/output/mod.rs

//! Console output pipeline.
//!
//! - [`classify`] turns a raw line into a tag, a message and a color.
//! - [`multiplexer`] allocates one writer per process and serializes the
//!   rendered lines onto the shared console stream.

pub mod classify;
pub mod multiplexer;

pub use classify::{Classification, classify};
pub use multiplexer::{ClassifiedLine, Output, OutputWriter, padding_width};

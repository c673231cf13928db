//! Pipeline module.
//!
//! Wires the components together: load, validate, compile, execute, stats.

mod builder;

pub use builder::{Pipeline, PipelineBuilder};

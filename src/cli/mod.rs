//! Command line interface module
//!
//! Argument parsing and the runner that turns arguments into a publishing run
//! and a process exit code.

pub mod args;
pub mod runner;

pub use args::{Args, OutputFormat};
pub use runner::Runner;

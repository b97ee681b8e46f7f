//! CLI layer.
//!
//! Provides the command-line interface using clap, dispatching to the
//! ingestion, ratio-calculation, and report-generation workflows.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use parser::{Cli, Commands, OutputFormat};

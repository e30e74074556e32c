//! CLI module for the paramstack tool.
//!
//! This module provides the command-line arguments and the summary
//! printed after a conversion.

mod commands;
mod output;

pub use commands::{Cli, OutputFormat, STDIO_PATH, parse_directive};
pub use output::OutputFormatter;

//! CLI module for exprcall
//!
//! Provides command-line interface for:
//! - explain: plan a call request and print the plan or its rejection
//! - query: run a call request against a JSON reference dataset

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, LogLevel};
pub use commands::{explain, query, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{read_json_file, write_json_line, write_text};

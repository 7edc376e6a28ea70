//! CLI argument definitions using clap
//!
//! Commands:
//! - exprcall explain --request <path> [--config <path>]
//! - exprcall query --request <path> --dataset <path> [--config <path>]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::observability::Severity;

/// exprcall - expression call retrieval with propagation planning
#[derive(Parser, Debug)]
#[command(name = "exprcall")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Lowest severity written to the stderr log
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan a call request and print the explain output
    Explain {
        /// Path to the JSON call request
        #[arg(long)]
        request: PathBuf,

        /// Path to the planner configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a call request against a reference dataset
    Query {
        /// Path to the JSON call request
        #[arg(long)]
        request: PathBuf,

        /// Path to the JSON reference dataset
        #[arg(long)]
        dataset: PathBuf,

        /// Path to the planner configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Log level accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Severity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Severity::Trace,
            LogLevel::Info => Severity::Info,
            LogLevel::Warn => Severity::Warn,
            LogLevel::Error => Severity::Error,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "exprcall",
            "query",
            "--request",
            "req.json",
            "--dataset",
            "data.json",
            "--log-level",
            "warn",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Warn);
        match cli.command {
            Command::Query {
                request,
                dataset,
                config,
            } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert_eq!(dataset, PathBuf::from("data.json"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_requires_dataset() {
        assert!(Cli::try_parse_from(["exprcall", "query", "--request", "req.json"]).is_err());
    }
}

//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::planner::PlannerError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("EXPR_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("EXPR_CLI_IO_ERROR: {0}")]
    Io(#[from] io::Error),

    #[error("EXPR_CLI_IO_ERROR: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Planner(#[from] PlannerError),

    #[error("{0}")]
    Executor(#[from] ExecutorError),
}

impl CliError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "EXPR_CLI_CONFIG_ERROR",
            CliError::Io(_) | CliError::Json(_) => "EXPR_CLI_IO_ERROR",
            CliError::Planner(err) => err.code().code(),
            CliError::Executor(err) => err.code(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

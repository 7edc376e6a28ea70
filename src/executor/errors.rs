//! # Executor Errors

use thiserror::Error;

use crate::model::ConditionId;
use crate::planner::PlannerError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor errors
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlannerError),

    /// Failure reported by the storage collaborator, propagated untouched
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cursor already closed")]
    CursorClosed,

    #[error("Unknown condition: {0}")]
    UnknownCondition(ConditionId),
}

impl ExecutorError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Planning(err) => err.code().code(),
            ExecutorError::Storage(_) => "EXPR_STORAGE_ERROR",
            ExecutorError::CursorClosed => "EXPR_CURSOR_CLOSED",
            ExecutorError::UnknownCondition(_) => "EXPR_UNKNOWN_CONDITION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ExecutorError::CursorClosed.code(), "EXPR_CURSOR_CLOSED");
        assert_eq!(
            ExecutorError::from(PlannerError::invalid_filter_set("x")).code(),
            "EXPR_INVALID_FILTER_SET"
        );
    }
}

//! Planner error types
//!
//! Error codes:
//! - EXPR_UNSUPPORTED_COMBINATION (REJECT)
//! - EXPR_INVALID_FILTER_SET (REJECT)
//! - EXPR_UNSUPPORTED_ORDERING (REJECT)
//! - EXPR_UNRECOGNIZED_FIELD (REJECT)
//! - EXPR_INVALID_REQUEST (REJECT)
//!
//! Planning performs no I/O, so every planning error is local, surfaced
//! before any physical query is issued, and never retryable.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{CallOrdering, ConditionDimension};

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// No registered combination matches the requested dimension set
    UnsupportedCombination,
    /// Filter set construction invariant violated
    InvalidFilterSet,
    /// Ordering the planner has no rule for
    UnsupportedOrdering,
    /// Attribute name outside the closed attribute enumeration
    UnrecognizedField,
    /// Request inconsistent with itself
    InvalidRequest,
}

impl PlannerErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::UnsupportedCombination => "EXPR_UNSUPPORTED_COMBINATION",
            PlannerErrorCode::InvalidFilterSet => "EXPR_INVALID_FILTER_SET",
            PlannerErrorCode::UnsupportedOrdering => "EXPR_UNSUPPORTED_ORDERING",
            PlannerErrorCode::UnrecognizedField => "EXPR_UNRECOGNIZED_FIELD",
            PlannerErrorCode::InvalidRequest => "EXPR_INVALID_REQUEST",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Offending item (dimension set, field name, ordering) if applicable
    item: Option<String>,
}

impl PlannerError {
    /// Create an unsupported combination error
    pub fn unsupported_combination(dims: &BTreeSet<ConditionDimension>) -> Self {
        let names: Vec<&str> = dims.iter().map(ConditionDimension::as_str).collect();
        let item = format!("{{{}}}", names.join(", "));
        Self {
            code: PlannerErrorCode::UnsupportedCombination,
            message: format!("No condition-parameter combination registered for {}", item),
            item: Some(item),
        }
    }

    /// Create an invalid filter set error
    pub fn invalid_filter_set(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::InvalidFilterSet,
            message: reason.into(),
            item: None,
        }
    }

    /// Create an unsupported ordering error
    pub fn unsupported_ordering(ordering: &CallOrdering, reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::UnsupportedOrdering,
            message: format!("Cannot order by '{}': {}", ordering, reason.into()),
            item: Some(ordering.to_string()),
        }
    }

    /// Create an unrecognized field error
    pub fn unrecognized_field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: PlannerErrorCode::UnrecognizedField,
            message: format!("Field '{}' is not a call attribute", name),
            item: Some(name),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::InvalidRequest,
            message: reason.into(),
            item: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending item if applicable
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

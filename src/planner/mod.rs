//! Query planner for expression calls
//!
//! Turns a call request into an immutable `QueryPlan`. Planning is a pure
//! decision phase: it issues no query and has no side effect, so every
//! decision can be tested without a store.
//!
//! # Design Principles
//!
//! - Deterministic: same request → same plan
//! - Closed: attributes and orderings are exhaustively matched enums
//! - Fail closed: unregistered combinations and unsupported orderings are
//!   errors, never fallbacks

mod batching;
mod errors;
mod explain;
mod plan;
mod planner;
mod request;

pub use batching::QueryBatcher;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use plan::{
    BatchingDecision, EvaluationStage, GeneSource, IdentitySource, PredicatePlacement, QueryPlan,
    RenderHint,
};
pub use planner::PropagationPlanner;
pub use request::{CallQuery, CallRequest};

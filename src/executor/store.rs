//! Storage collaborator contract
//!
//! Whatever renders and issues the physical query implements `CallStore`.
//! It must honor the plan: predicates placed after aggregation are never
//! applied to single rows, only fetched attributes are produced, and rows
//! of one execution follow the plan's ordering.

use super::errors::ExecutorResult;
use crate::model::{CallRow, GeneId};
use crate::planner::QueryPlan;

/// A storage engine able to execute query plans
pub trait CallStore {
    /// Rows of one physical execution
    type Rows: Iterator<Item = ExecutorResult<CallRow>>;

    /// Candidate genes for a batched plan sourced from the store: genes
    /// matching the plan's filter, ascending, `limit` of them starting at
    /// `offset`
    fn candidate_genes(
        &self,
        plan: &QueryPlan,
        offset: usize,
        limit: usize,
    ) -> ExecutorResult<Vec<GeneId>>;

    /// Runs one physical execution of `plan`, restricted to `genes` when
    /// given. Dropping the returned rows releases the execution.
    fn execute(&self, plan: &QueryPlan, genes: Option<&[GeneId]>) -> ExecutorResult<Self::Rows>;
}

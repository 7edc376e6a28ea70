//! Batching decisions
//!
//! Aggregating under sub-stage propagation joins every row of a gene with
//! every ancestor stage, so the fan-out grows with the candidate gene
//! population. When that population is not bounded by a small caller
//! restriction, execution is split into sequential batches of genes in
//! ascending gene id order.

use super::errors::{PlannerError, PlannerResult};
use super::plan::{BatchingDecision, GeneSource};
use crate::config::PlannerConfig;
use crate::filter::FilterSet;
use crate::model::{AttributeSet, CallAttribute, CallOrdering, OrderingAttribute, SortDirection};

/// Decides whether and how a plan is batched
#[derive(Debug, Clone, Copy)]
pub struct QueryBatcher<'a> {
    config: &'a PlannerConfig,
}

impl<'a> QueryBatcher<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// Decides batching for a plan.
    ///
    /// Only aggregation under sub-stage propagation is batched. A gene
    /// restriction no larger than the single-pass limit runs in one pass.
    pub fn decide(
        &self,
        need_aggregation: bool,
        sub_stage: bool,
        filters: &FilterSet,
        fetched: &AttributeSet,
    ) -> BatchingDecision {
        if !(need_aggregation && sub_stage) {
            return BatchingDecision::SinglePass;
        }

        let source = match filters.gene_id_bound() {
            Some(genes) if genes.len() <= self.config.single_pass_gene_limit => {
                return BatchingDecision::SinglePass;
            }
            // BTreeSet iteration is ascending.
            Some(genes) => GeneSource::Restricted(genes.into_iter().collect()),
            None => GeneSource::Store,
        };

        BatchingDecision::Batched {
            batch_size: self.config.batch_size,
            source,
            deduplicate: !naturally_unique(fetched),
        }
    }

    /// Checks that an ordering can be honored across batches.
    ///
    /// Batches run in ascending gene order, so the concatenation is only
    /// globally ordered when the first key is the gene id, ascending.
    pub fn check_ordering(&self, ordering: &[CallOrdering]) -> PlannerResult<()> {
        match ordering.first() {
            None => Ok(()),
            Some(CallOrdering {
                attribute: OrderingAttribute::GeneId,
                direction: SortDirection::Asc,
            }) => Ok(()),
            Some(first) => Err(PlannerError::unsupported_ordering(
                first,
                "batched execution only preserves ascending gene order",
            )),
        }
    }
}

/// True when fetched rows are unique across the whole candidate population
fn naturally_unique(fetched: &AttributeSet) -> bool {
    fetched.contains(CallAttribute::Id)
        || (fetched.contains(CallAttribute::GeneId) && fetched.contains(CallAttribute::ConditionId))
}

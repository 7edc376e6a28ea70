//! Query plans
//!
//! A `QueryPlan` is the immutable hand-off from planning to execution.
//! Whatever renders or executes it must honor the placement: a predicate
//! placed after aggregation is never applied to single rows.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::combination::ConditionDimensionCombination;
use crate::filter::{FilterMatcher, FilterSet, PredicateKind, PredicateScope};
use crate::model::{AttributeSet, CallAttribute, CallOrdering, DataType, GeneId};

/// When a predicate is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    /// Once per physical row
    PreAggregation,
    /// Once per aggregated call
    PostAggregation,
}

impl EvaluationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStage::PreAggregation => "PRE",
            EvaluationStage::PostAggregation => "POST",
        }
    }
}

/// Placement of one predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PredicatePlacement {
    pub scope: PredicateScope,
    pub kind: PredicateKind,
    pub stage: EvaluationStage,
}

/// Source of the identity exposed on calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Identifier of the physical row
    Physical,
    /// Composite (gene, anatomical entity, stage) key
    Synthesized,
}

/// Where batches take their genes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneSource {
    /// The caller's gene restriction, sorted ascending
    Restricted(Vec<GeneId>),
    /// Every gene of the store matching the filter, in gene id order
    Store,
}

/// How the plan is executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchingDecision {
    /// One physical execution
    SinglePass,
    /// Sequential executions over bounded gene slices
    Batched {
        batch_size: usize,
        source: GeneSource,
        /// Suppress calls already emitted by a previous batch
        deduplicate: bool,
    },
}

impl BatchingDecision {
    pub fn is_batched(&self) -> bool {
        matches!(self, BatchingDecision::Batched { .. })
    }

    pub fn deduplicates(&self) -> bool {
        matches!(
            self,
            BatchingDecision::Batched {
                deduplicate: true,
                ..
            }
        )
    }
}

/// Opaque hint for the storage renderer; carries no logical meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderHint {
    /// Start the physical join from the gene table
    DriveFromGeneTable,
}

impl RenderHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderHint::DriveFromGeneTable => "DRIVE_FROM_GENE_TABLE",
        }
    }
}

/// Immutable query plan (no runtime state)
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Resolved condition-parameter combination
    pub combination: ConditionDimensionCombination,
    /// Call filter, after promotion
    pub filters: FilterSet,
    /// Attributes exposed on emitted calls
    pub requested: AttributeSet,
    /// Attributes the physical execution must produce
    pub fetched: AttributeSet,
    /// Data types whose evidence is considered
    pub data_types: BTreeSet<DataType>,
    pub sub_anat: bool,
    pub sub_stage: bool,
    pub need_aggregation: bool,
    pub need_post_aggregation_filter: bool,
    pub identity: IdentitySource,
    /// Placement of every predicate of `filters`
    pub placement: Vec<PredicatePlacement>,
    pub ordering: Vec<CallOrdering>,
    pub batching: BatchingDecision,
    pub hints: Vec<RenderHint>,
}

impl QueryPlan {
    /// Stage a predicate is evaluated at, if the filter carries it
    pub fn stage_of(&self, scope: PredicateScope, kind: PredicateKind) -> Option<EvaluationStage> {
        self.placement
            .iter()
            .find(|p| p.scope == scope && p.kind == kind)
            .map(|p| p.stage)
    }

    /// Predicates evaluated only after aggregation
    pub fn post_aggregation_predicates(
        &self,
    ) -> impl Iterator<Item = (PredicateScope, PredicateKind)> + '_ {
        self.placement
            .iter()
            .filter(|p| p.stage == EvaluationStage::PostAggregation)
            .map(|p| (p.scope, p.kind))
    }

    /// Matcher honoring this plan's placement
    pub fn matcher(&self) -> FilterMatcher<'_> {
        FilterMatcher::new(&self.filters, self.post_aggregation_predicates())
    }

    pub fn fetches(&self, attr: CallAttribute) -> bool {
        self.fetched.contains(attr)
    }

    pub fn considers(&self, data_type: DataType) -> bool {
        self.data_types.contains(&data_type)
    }

    pub fn has_hint(&self, hint: RenderHint) -> bool {
        self.hints.contains(&hint)
    }
}

//! Planner Property Tests
//!
//! - Planning is pure: the same request always gives the same plan
//! - Requests without aggregation-sensitive fields plan without aggregation
//! - The observed flag is true iff neither origin is descendant-only

use std::collections::{BTreeMap, BTreeSet};

use exprcall::combination::CombinationRegistry;
use exprcall::config::PlannerConfig;
use exprcall::filter::{FilterGroup, FilterSet};
use exprcall::model::{
    observed, AttributeSet, CallAttribute, CallOrdering, ConditionDimension, DataQuality,
    DataType, GeneId, OrderingAttribute, OriginOfLine,
};
use exprcall::planner::{BatchingDecision, CallQuery, PlannerResult, PropagationPlanner, QueryPlan};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_quality() -> impl Strategy<Value = DataQuality> {
    prop_oneof![Just(DataQuality::Low), Just(DataQuality::High)]
}

fn arb_min_qualities(max: usize) -> impl Strategy<Value = BTreeMap<DataType, DataQuality>> {
    prop::collection::btree_map(prop::sample::select(DataType::ALL.to_vec()), arb_quality(), 0..=max)
}

fn arb_genes() -> impl Strategy<Value = BTreeSet<GeneId>> {
    prop::collection::btree_set(1u32..20, 1..4)
}

fn build_group(
    genes: BTreeSet<GeneId>,
    qualities: BTreeMap<DataType, DataQuality>,
    observed: Option<bool>,
) -> FilterGroup {
    let group = qualities
        .into_iter()
        .fold(FilterGroup::new().with_gene_ids(genes), |g, (dt, q)| {
            g.with_min_quality(dt, q)
        });
    match observed {
        Some(flag) => group.with_observed(flag),
        None => group,
    }
}

/// Any group, possibly mixing data types and filtering on origins
fn arb_group() -> impl Strategy<Value = FilterGroup> {
    (arb_genes(), arb_min_qualities(3), proptest::option::of(any::<bool>()))
        .prop_map(|(genes, qualities, observed)| build_group(genes, qualities, observed))
}

/// A group with at most one data type and no origin predicate
fn arb_plain_group() -> impl Strategy<Value = FilterGroup> {
    (arb_genes(), arb_min_qualities(1)).prop_map(|(genes, qualities)| build_group(genes, qualities, None))
}

fn arb_attributes() -> impl Strategy<Value = AttributeSet> {
    prop::collection::btree_set(prop::sample::select(CallAttribute::ALL.to_vec()), 1..=CallAttribute::ALL.len())
        .prop_map(|attrs| attrs.into_iter().collect())
}

fn query(filters: FilterSet, attributes: AttributeSet, sub_anat: bool, sub_stage: bool) -> CallQuery {
    CallQuery::new(
        filters,
        [ConditionDimension::Anatomy, ConditionDimension::Stage],
    )
    .with_attributes(attributes)
    .with_sub_anat(sub_anat)
    .with_sub_stage(sub_stage)
}

fn plan(query: &CallQuery) -> PlannerResult<QueryPlan> {
    let registry = CombinationRegistry::reference();
    let config = PlannerConfig::default();
    PropagationPlanner::new(&registry, &config).plan(query)
}

// =============================================================================
// Planning Purity
// =============================================================================

proptest! {
    #[test]
    fn planning_is_pure(
        groups in prop::collection::vec(arb_group(), 1..4),
        attributes in arb_attributes(),
        sub_anat in any::<bool>(),
        sub_stage in any::<bool>(),
        by_rank in any::<bool>(),
    ) {
        let filters = FilterSet::new(groups).unwrap();
        let mut query = query(filters, attributes, sub_anat, sub_stage);
        if by_rank {
            query = query.with_ordering(CallOrdering::desc(OrderingAttribute::MeanRank));
        }

        let first = plan(&query);
        let second = plan(&query.clone());
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// Minimal Plan
// =============================================================================

proptest! {
    #[test]
    fn insensitive_request_needs_no_aggregation(
        groups in prop::collection::vec(arb_plain_group(), 1..4),
        attributes in prop::collection::btree_set(
            prop::sample::select(vec![
                CallAttribute::Id,
                CallAttribute::GeneId,
                CallAttribute::ConditionId,
            ]),
            1..=3,
        ),
        sub_stage in any::<bool>(),
    ) {
        let filters = FilterSet::new(groups).unwrap();
        let attributes: AttributeSet = attributes.into_iter().collect();
        let plan = plan(&query(filters, attributes, false, sub_stage)).unwrap();

        prop_assert!(!plan.need_aggregation);
        prop_assert!(!plan.need_post_aggregation_filter);
        prop_assert_eq!(plan.batching, BatchingDecision::SinglePass);
    }

    #[test]
    fn mixed_data_types_force_aggregation(
        genes in arb_genes(),
        attributes in arb_attributes(),
        sub_stage in any::<bool>(),
    ) {
        let group = FilterGroup::new()
            .with_gene_ids(genes)
            .with_min_quality(DataType::RnaSeq, DataQuality::High)
            .with_min_quality(DataType::Est, DataQuality::Low);
        let filters = FilterSet::single(group).unwrap();
        let plan = plan(&query(filters, attributes, false, sub_stage)).unwrap();

        prop_assert!(plan.need_aggregation);
        prop_assert!(plan.need_post_aggregation_filter);
    }
}

// =============================================================================
// Observed Flag
// =============================================================================

fn arb_origin() -> impl Strategy<Value = OriginOfLine> {
    prop::sample::select(OriginOfLine::ALL.to_vec())
}

proptest! {
    #[test]
    fn observed_iff_no_descendant_only_origin(anat in arb_origin(), stage in arb_origin()) {
        let expected = anat != OriginOfLine::Descendant && stage != OriginOfLine::Descendant;
        prop_assert_eq!(observed(anat, stage), expected);
    }
}

#[test]
fn test_observed_concrete_cases() {
    use OriginOfLine::*;
    assert!(observed(Own, Own));
    assert!(!observed(Descendant, Own));
    assert!(!observed(Both, Descendant));
    assert!(observed(Both, Both));
}

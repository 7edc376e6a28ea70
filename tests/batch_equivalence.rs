//! Batch Equivalence Tests
//!
//! Splitting aggregation into gene batches must not change the result:
//! concatenating the batches (deduplicated when required) gives the same
//! calls as one single-pass execution.

mod fixtures;

use exprcall::config::PlannerConfig;
use exprcall::executor::ResultCursor;
use exprcall::filter::{FilterGroup, FilterSet};
use exprcall::model::{AttributeSet, CallAttribute, CallOrdering, OrderingAttribute};
use exprcall::planner::{BatchingDecision, CallQuery, GeneSource};

use fixtures::{anat_stage, as_sorted_json, plan, reference_store, run, small_batches, SPECIES};

// =============================================================================
// Helper Functions
// =============================================================================

fn genes_one_to_five() -> FilterSet {
    FilterSet::single(FilterGroup::new().with_gene_ids(1..=5)).unwrap()
}

fn propagated(filters: FilterSet, attributes: &[CallAttribute]) -> CallQuery {
    CallQuery::new(filters, anat_stage())
        .with_attributes(attributes.iter().copied().collect::<AttributeSet>())
        .with_sub_stage(true)
}

// =============================================================================
// Restricted Population
// =============================================================================

/// Batches of two over genes 1..=5 give the single-pass calls.
#[test]
fn test_batched_equals_single_pass() {
    let store = reference_store();
    let query = propagated(
        genes_one_to_five(),
        &[
            CallAttribute::GeneId,
            CallAttribute::ConditionId,
            CallAttribute::DataTypeQuality,
            CallAttribute::StageOriginOfLine,
            CallAttribute::ObservedData,
        ],
    );

    let single = plan(&PlannerConfig::default(), &query);
    assert_eq!(single.batching, BatchingDecision::SinglePass);

    let batched = plan(&small_batches(2), &query);
    assert!(matches!(
        batched.batching,
        BatchingDecision::Batched {
            batch_size: 2,
            source: GeneSource::Restricted(_),
            ..
        }
    ));

    let expected = run(&store, &single);
    assert!(!expected.is_empty());
    assert_eq!(as_sorted_json(&run(&store, &batched)), as_sorted_json(&expected));
}

/// Without identity attributes, duplicates across batches are suppressed
/// and the result still matches.
#[test]
fn test_deduplicated_batches_equal_single_pass() {
    let store = reference_store();
    let query = propagated(
        genes_one_to_five(),
        &[CallAttribute::DataTypeQuality, CallAttribute::ObservedData],
    );

    let batched = plan(&small_batches(2), &query);
    assert!(batched.batching.deduplicates());

    let mut cursor = ResultCursor::new(&store, &batched);
    let calls: Vec<_> = cursor.by_ref().map(|c| c.unwrap()).collect();
    assert_eq!(cursor.stats().batches, 3);
    assert!(cursor.stats().duplicates_suppressed > 0);

    let single = run(&store, &plan(&PlannerConfig::default(), &query));
    assert_eq!(as_sorted_json(&calls), as_sorted_json(&single));
}

/// Batched output keeps ascending gene order across batch boundaries.
#[test]
fn test_batched_output_is_gene_ordered() {
    let store = reference_store();
    let query = propagated(
        genes_one_to_five(),
        &[CallAttribute::GeneId, CallAttribute::MeanRank],
    )
    .with_ordering(CallOrdering::asc(OrderingAttribute::GeneId));

    let genes: Vec<_> = run(&store, &plan(&small_batches(2), &query))
        .into_iter()
        .map(|c| c.gene_id.unwrap())
        .collect();
    let mut sorted = genes.clone();
    sorted.sort();
    assert_eq!(genes, sorted);
    assert_eq!(genes.first(), Some(&1));
    assert_eq!(genes.last(), Some(&5));
}

// =============================================================================
// Store-Sourced Population
// =============================================================================

/// Candidate genes read from the store in small batches give the same
/// calls as one large batch.
#[test]
fn test_store_batches_equal_one_batch() {
    let store = reference_store();
    let filters = FilterSet::single(FilterGroup::new().with_species_ids([SPECIES])).unwrap();
    let query = propagated(
        filters,
        &[
            CallAttribute::Id,
            CallAttribute::GeneId,
            CallAttribute::DataTypeRank,
        ],
    );

    let small = plan(&small_batches(2), &query);
    let large = plan(&small_batches(10_000), &query);
    assert!(matches!(
        small.batching,
        BatchingDecision::Batched {
            source: GeneSource::Store,
            deduplicate: false,
            ..
        }
    ));

    let mut cursor = ResultCursor::new(&store, &small);
    let calls: Vec<_> = cursor.by_ref().map(|c| c.unwrap()).collect();
    // 8 candidate genes; the probe after the fourth full batch finds none
    assert_eq!(cursor.stats().batches, 4);

    assert_eq!(as_sorted_json(&calls), as_sorted_json(&run(&store, &large)));
}

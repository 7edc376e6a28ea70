//! Shared reference dataset for integration tests
//!
//! Anatomy: A2 is part of A1. Stages: S2 and S3 are sub-stages of S1.
//! Every condition belongs to species 9606.

#![allow(dead_code)]

use std::collections::BTreeMap;

use exprcall::combination::CombinationRegistry;
use exprcall::config::PlannerConfig;
use exprcall::executor::{Dataset, HierarchyEdge, MemoryCallStore, RawCall, ResultCursor};
use exprcall::model::{
    Call, Condition, ConditionDimension, ConditionId, ConditionParams, DataQuality, DataType,
    Evidence, GeneId,
};
use exprcall::planner::{CallQuery, PropagationPlanner, QueryPlan};

pub const SPECIES: u32 = 9606;

fn condition(id: ConditionId, anat: &str, stage: &str) -> Condition {
    Condition::new(
        id,
        ConditionParams::new(SPECIES)
            .with_anat_entity(anat)
            .with_stage(stage),
    )
}

struct CallBuilder {
    calls: Vec<RawCall>,
}

impl CallBuilder {
    fn add(&mut self, gene_id: GeneId, condition_id: ConditionId, evidence: &[(DataType, Evidence)]) {
        let id = self.calls.len() as u64 + 1;
        self.calls.push(RawCall {
            id,
            gene_id,
            condition_id,
            evidence: evidence.iter().copied().collect::<BTreeMap<_, _>>(),
        });
    }
}

/// The reference dataset.
///
/// Genes 1..=5 share the same shape with gene-dependent ranks; even genes
/// are also seen in A2. Genes 7, 42 and 10 have their own calls.
pub fn reference_dataset() -> Dataset {
    let high = |rank: f64| Evidence::new(DataQuality::High).with_rank(rank);
    let low = Evidence::new(DataQuality::Low);

    let mut calls = CallBuilder { calls: Vec::new() };
    for gene in 1..=5u32 {
        calls.add(gene, 2, &[(DataType::RnaSeq, high(gene as f64 * 10.0))]);
        calls.add(gene, 4, &[(DataType::Est, low)]);
        if gene % 2 == 0 {
            calls.add(gene, 3, &[(DataType::Affymetrix, high(5.0))]);
        }
    }
    calls.add(7, 2, &[(DataType::RnaSeq, high(12.0))]);
    calls.add(7, 5, &[(DataType::Est, low)]);
    calls.add(42, 3, &[(DataType::InSitu, Evidence::new(DataQuality::High))]);
    calls.add(42, 1, &[(DataType::RnaSeq, Evidence::new(DataQuality::Low).with_rank(100.0))]);
    calls.add(10, 2, &[(DataType::Est, Evidence::new(DataQuality::High))]);
    calls.add(10, 4, &[(DataType::RnaSeq, high(3.5))]);

    Dataset {
        conditions: vec![
            condition(1, "A1", "S1"),
            condition(2, "A1", "S2"),
            condition(3, "A2", "S2"),
            condition(4, "A1", "S3"),
            condition(5, "A2", "S3"),
        ],
        calls: calls.calls,
        anatomy: vec![HierarchyEdge::new("A2", "A1")],
        stages: vec![HierarchyEdge::new("S2", "S1"), HierarchyEdge::new("S3", "S1")],
    }
}

pub fn reference_store() -> MemoryCallStore {
    MemoryCallStore::build(&reference_dataset(), &CombinationRegistry::reference())
        .expect("reference dataset builds")
}

pub fn anat_stage() -> [ConditionDimension; 2] {
    [ConditionDimension::Anatomy, ConditionDimension::Stage]
}

/// Plans a query against the reference registry
pub fn plan(config: &PlannerConfig, query: &CallQuery) -> QueryPlan {
    let registry = CombinationRegistry::reference();
    PropagationPlanner::new(&registry, config)
        .plan(query)
        .expect("query plans")
}

/// Drains a cursor over the plan
pub fn run(store: &MemoryCallStore, plan: &QueryPlan) -> Vec<Call> {
    ResultCursor::new(store, plan)
        .collect::<Result<Vec<_>, _>>()
        .expect("execution succeeds")
}

/// Calls as sorted JSON lines, for order-insensitive comparison
pub fn as_sorted_json(calls: &[Call]) -> Vec<String> {
    let mut lines: Vec<String> = calls
        .iter()
        .map(|c| serde_json::to_string(c).expect("call serializes"))
        .collect();
    lines.sort();
    lines
}

/// Config that splits any restricted population larger than one gene
pub fn small_batches(batch_size: usize) -> PlannerConfig {
    PlannerConfig::default()
        .with_batch_size(batch_size)
        .with_single_pass_gene_limit(1)
}

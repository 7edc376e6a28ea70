//! Explain plan output
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use super::errors::PlannerError;
use super::plan::{BatchingDecision, GeneSource, PredicatePlacement, QueryPlan};
use crate::filter::{PredicateKind, PredicateScope};

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// Resolved combination and its aggregated call table
    pub combination: Option<String>,
    /// Propagation flags
    pub propagation: Option<String>,
    pub need_aggregation: Option<bool>,
    pub need_post_aggregation_filter: Option<bool>,
    pub identity: Option<String>,
    /// Requested attributes
    pub requested: Option<String>,
    /// Fetched attributes
    pub fetched: Option<String>,
    /// Predicate placement
    pub predicates: Vec<String>,
    /// Ordering keys
    pub ordering: Vec<String>,
    /// Batching description
    pub batching: Option<String>,
    /// Render hints
    pub hints: Vec<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let binding = plan.combination.binding();
        let table = if plan.sub_anat {
            binding.global_call_table
        } else {
            binding.raw_call_table
        };

        Self {
            accepted: true,
            combination: Some(format!("{} ({})", plan.combination.name(), table)),
            propagation: Some(format!(
                "substructures={} sub_stages={}",
                plan.sub_anat, plan.sub_stage
            )),
            need_aggregation: Some(plan.need_aggregation),
            need_post_aggregation_filter: Some(plan.need_post_aggregation_filter),
            identity: Some(format!("{:?}", plan.identity).to_uppercase()),
            requested: Some(plan.requested.to_string()),
            fetched: Some(plan.fetched.to_string()),
            predicates: plan.placement.iter().map(describe_placement).collect(),
            ordering: plan.ordering.iter().map(ToString::to_string).collect(),
            batching: Some(describe_batching(&plan.batching)),
            hints: plan.hints.iter().map(|h| h.as_str().to_string()).collect(),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            combination: None,
            propagation: None,
            need_aggregation: None,
            need_post_aggregation_filter: None,
            identity: None,
            requested: None,
            fetched: None,
            predicates: Vec::new(),
            ordering: Vec::new(),
            batching: None,
            hints: Vec::new(),
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

fn describe_placement(p: &PredicatePlacement) -> String {
    let scope = match p.scope {
        PredicateScope::Global => "global".to_string(),
        PredicateScope::Group(index) => format!("group {}", index),
    };
    let kind = match p.kind {
        PredicateKind::GeneIds => "gene_ids".to_string(),
        PredicateKind::SpeciesIds => "species_ids".to_string(),
        PredicateKind::Condition(dim) => format!("condition.{}", dim),
        PredicateKind::ConditionIds => "condition_ids".to_string(),
        PredicateKind::MinQuality(dt) => format!("min_quality.{}", dt),
        PredicateKind::AnatOrigin => "anat_origin_of_line".to_string(),
        PredicateKind::StageOrigin => "stage_origin_of_line".to_string(),
        PredicateKind::Observed => "observed_data".to_string(),
    };
    format!("[{}] {} {}", p.stage.as_str(), scope, kind)
}

fn describe_batching(batching: &BatchingDecision) -> String {
    match batching {
        BatchingDecision::SinglePass => "SINGLE_PASS".to_string(),
        BatchingDecision::Batched {
            batch_size,
            source,
            deduplicate,
        } => {
            let source = match source {
                GeneSource::Restricted(genes) => format!("{} restricted genes", genes.len()),
                GeneSource::Store => "store genes".to_string(),
            };
            format!(
                "BATCHED size={} over {} deduplicate={}",
                batch_size, source, deduplicate
            )
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(combination) = &self.combination {
                writeln!(f, "Combination: {}", combination)?;
            }
            if let Some(propagation) = &self.propagation {
                writeln!(f, "Propagation: {}", propagation)?;
            }
            if let Some(agg) = self.need_aggregation {
                writeln!(f, "Aggregation: {}", agg)?;
            }
            if let Some(post) = self.need_post_aggregation_filter {
                writeln!(f, "Post-Aggregation Filter: {}", post)?;
            }
            if let Some(identity) = &self.identity {
                writeln!(f, "Identity: {}", identity)?;
            }
            if let Some(requested) = &self.requested {
                writeln!(f, "Requested: {}", requested)?;
            }
            if let Some(fetched) = &self.fetched {
                writeln!(f, "Fetched: {}", fetched)?;
            }
            if !self.predicates.is_empty() {
                writeln!(f, "Predicates:")?;
                for pred in &self.predicates {
                    writeln!(f, "  - {}", pred)?;
                }
            }
            if !self.ordering.is_empty() {
                writeln!(f, "Order By: {}", self.ordering.join(", "))?;
            }
            if let Some(batching) = &self.batching {
                writeln!(f, "Batching: {}", batching)?;
            }
            if !self.hints.is_empty() {
                writeln!(f, "Hints: {}", self.hints.join(", "))?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combination::CombinationRegistry;
    use crate::config::PlannerConfig;
    use crate::filter::{FilterGroup, FilterSet};
    use crate::model::{CallAttribute, ConditionDimension, DataQuality, DataType};
    use crate::planner::{CallQuery, PropagationPlanner};

    fn plan(query: &CallQuery) -> Result<QueryPlan, PlannerError> {
        let registry = CombinationRegistry::reference();
        let config = PlannerConfig::default();
        PropagationPlanner::new(&registry, &config).plan(query)
    }

    #[test]
    fn test_explain_accepted_plan() {
        let filters = FilterSet::single(
            FilterGroup::new()
                .with_gene_ids([7, 42])
                .with_min_quality(DataType::RnaSeq, DataQuality::High)
                .with_min_quality(DataType::Affymetrix, DataQuality::High),
        )
        .unwrap();
        let query = CallQuery::new(filters, [ConditionDimension::Anatomy, ConditionDimension::Stage])
            .with_attributes([CallAttribute::Id, CallAttribute::GeneId])
            .with_sub_stage(true);

        let explain = ExplainPlan::from_plan(&plan(&query).unwrap());
        let output = explain.to_string();

        assert!(output.contains("Status: ACCEPTED"));
        assert!(output.contains("Combination: anatomy_stage (anat_entity_stage_expression)"));
        assert!(output.contains("Aggregation: true"));
        assert!(output.contains("Identity: SYNTHESIZED"));
        assert!(output.contains("[PRE] global gene_ids"));
        assert!(output.contains("[POST] group 0 min_quality.rna_seq"));
        assert!(output.contains("Batching: SINGLE_PASS"));
        assert!(output.contains("Hints: DRIVE_FROM_GENE_TABLE"));
    }

    #[test]
    fn test_explain_rejected_plan() {
        let filters = FilterSet::single(FilterGroup::new().with_gene_ids([1])).unwrap();
        let query = CallQuery::new(filters, [ConditionDimension::Sex]);
        let err = plan(&query).unwrap_err();

        let output = ExplainPlan::from_error(&err).to_string();
        assert!(output.contains("Status: REJECTED"));
        assert!(output.contains("EXPR_UNSUPPORTED_COMBINATION"));
    }

    #[test]
    fn test_explain_is_deterministic() {
        let filters = FilterSet::single(FilterGroup::new().with_species_ids([9606])).unwrap();
        let query = CallQuery::new(filters, [ConditionDimension::Anatomy, ConditionDimension::Stage])
            .with_attributes([CallAttribute::DataTypeQuality])
            .with_sub_stage(true);
        let first = ExplainPlan::from_plan(&plan(&query).unwrap());
        let second = ExplainPlan::from_plan(&plan(&query).unwrap());
        assert_eq!(first.to_string(), second.to_string());
        assert!(first.to_string().contains("BATCHED size=5000 over store genes deduplicate=true"));
    }
}

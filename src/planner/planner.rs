//! Propagation planner
//!
//! Produces deterministic query plans. Planning is pure: no I/O, no
//! logging, same inputs → same plan.
//!
//! Decision procedure (strict order):
//! 1. Validate the request and resolve the condition-parameter combination
//! 2. Decide aggregation from the requested attributes and ordering
//! 3. Force aggregation and post-aggregation filtering for groups that AND
//!    quality predicates over several data types
//! 4. Same for predicates on origin of line or the observed flag
//! 5. Place every predicate before or after aggregation
//! 6. Widen the fetched attributes
//! 7. Choose the identity source, batching and render hints

use std::collections::BTreeSet;

use super::batching::QueryBatcher;
use super::errors::{PlannerError, PlannerResult};
use super::plan::{
    EvaluationStage, IdentitySource, PredicatePlacement, QueryPlan, RenderHint,
};
use super::request::CallQuery;
use crate::combination::{CombinationRegistry, ConditionDimensionCombination};
use crate::config::PlannerConfig;
use crate::filter::{FilterSet, PredicateKind, PredicateScope};
use crate::model::{
    AttributeSet, CallAttribute, CallOrdering, ConditionDimension, DataType, OrderingAttribute,
};

/// Planner turning call requests into query plans
pub struct PropagationPlanner<'a> {
    registry: &'a CombinationRegistry,
    config: &'a PlannerConfig,
}

impl<'a> PropagationPlanner<'a> {
    /// Creates a new planner
    pub fn new(registry: &'a CombinationRegistry, config: &'a PlannerConfig) -> Self {
        Self { registry, config }
    }

    /// Plans a request, returning an immutable plan or error.
    pub fn plan(&self, query: &CallQuery) -> PlannerResult<QueryPlan> {
        // 1. Validate
        self.config
            .validate()
            .map_err(|err| PlannerError::invalid_request(err.to_string()))?;
        if query.attributes.is_empty() {
            return Err(PlannerError::invalid_request("No attribute requested"));
        }
        let combination = self.registry.resolve(&query.dimensions)?;
        validate_propagation(query, combination)?;
        validate_condition_predicates(&query.filters, combination)?;
        validate_ordering(&query.ordering, combination)?;
        let data_types = query.effective_data_types();
        validate_quality_predicates(query, &data_types)?;

        // 2. Aggregation required by requested attributes or ordering
        let sensitive = query
            .attributes
            .iter()
            .any(|attr| attr.needs_aggregation(query.sub_anat))
            || query
                .ordering
                .iter()
                .any(|o| o.attribute == OrderingAttribute::MeanRank);
        let mut need_aggregation = query.sub_stage && sensitive;

        // 3-5. Placement; anything post forces aggregation
        let placement = place_predicates(&query.filters);
        let need_post_aggregation_filter = placement
            .iter()
            .any(|p| p.stage == EvaluationStage::PostAggregation);
        need_aggregation |= need_post_aggregation_filter;

        // 6-7. Identity and fetched attributes
        let identity = if need_aggregation || query.sub_stage {
            IdentitySource::Synthesized
        } else {
            IdentitySource::Physical
        };
        let fetched = widen_fetched(query, &placement, identity);

        let batcher = QueryBatcher::new(self.config);
        let batching = batcher.decide(need_aggregation, query.sub_stage, &query.filters, &fetched);
        if batching.is_batched() {
            batcher.check_ordering(&query.ordering)?;
        }

        let mut hints = Vec::new();
        if need_aggregation && query.filters.gene_id_bound().is_some() {
            hints.push(RenderHint::DriveFromGeneTable);
        }

        Ok(QueryPlan {
            combination: combination.clone(),
            filters: query.filters.clone(),
            requested: query.attributes.clone(),
            fetched,
            data_types,
            sub_anat: query.sub_anat,
            sub_stage: query.sub_stage,
            need_aggregation,
            need_post_aggregation_filter,
            identity,
            placement,
            ordering: query.ordering.clone(),
            batching,
            hints,
        })
    }
}

/// Propagation along a dimension needs that dimension in the combination
fn validate_propagation(
    query: &CallQuery,
    combination: &ConditionDimensionCombination,
) -> PlannerResult<()> {
    let checks = [
        (query.sub_anat, ConditionDimension::Anatomy, "substructure"),
        (query.sub_stage, ConditionDimension::Stage, "sub-stage"),
    ];
    for (active, dim, name) in checks {
        if active && !combination.covers(dim) {
            return Err(PlannerError::invalid_request(format!(
                "{} propagation requested without the {} dimension",
                name, dim
            )));
        }
    }
    Ok(())
}

fn validate_condition_predicates(
    filters: &FilterSet,
    combination: &ConditionDimensionCombination,
) -> PlannerResult<()> {
    match filters
        .constrained_dimensions()
        .into_iter()
        .find(|dim| !combination.covers(*dim))
    {
        Some(dim) => Err(PlannerError::invalid_request(format!(
            "Condition predicate on {} outside combination '{}'",
            dim,
            combination.name()
        ))),
        None => Ok(()),
    }
}

/// Every ordering key needs a rule; condition keys need their dimension
fn validate_ordering(
    ordering: &[CallOrdering],
    combination: &ConditionDimensionCombination,
) -> PlannerResult<()> {
    for key in ordering {
        let dim = match key.attribute {
            OrderingAttribute::GeneId
            | OrderingAttribute::ConditionId
            | OrderingAttribute::MeanRank => None,
            OrderingAttribute::AnatEntityId => Some(ConditionDimension::Anatomy),
            OrderingAttribute::StageId => Some(ConditionDimension::Stage),
        };
        if let Some(dim) = dim.filter(|d| !combination.covers(*d)) {
            return Err(PlannerError::unsupported_ordering(
                key,
                format!("combination '{}' has no {} dimension", combination.name(), dim),
            ));
        }
    }
    Ok(())
}

/// A quality predicate on an ignored data type could never hold
fn validate_quality_predicates(
    query: &CallQuery,
    data_types: &BTreeSet<DataType>,
) -> PlannerResult<()> {
    for group in query.filters.groups() {
        if let Some(dt) = group
            .min_qualities()
            .keys()
            .find(|dt| !data_types.contains(dt))
        {
            return Err(PlannerError::invalid_request(format!(
                "Quality predicate on data type {} which is not requested",
                dt
            )));
        }
    }
    Ok(())
}

/// Places every predicate of the filter set.
///
/// Origin and observed predicates read derived values and are post. So
/// are the quality predicates of a group ANDing several data types. The
/// rest is evaluated per physical row.
fn place_predicates(filters: &FilterSet) -> Vec<PredicatePlacement> {
    let locals = filters.local_groups();
    filters
        .predicates()
        .into_iter()
        .map(|(scope, kind)| {
            let post = match (scope, kind) {
                (_, kind) if kind.is_origin() => true,
                (PredicateScope::Group(index), PredicateKind::MinQuality(_)) => {
                    locals[index].mixes_data_types()
                }
                _ => false,
            };
            PredicatePlacement {
                scope,
                kind,
                stage: if post {
                    EvaluationStage::PostAggregation
                } else {
                    EvaluationStage::PreAggregation
                },
            }
        })
        .collect()
}

/// Requested attributes plus whatever evaluation, derivation and ordering
/// read
fn widen_fetched(
    query: &CallQuery,
    placement: &[PredicatePlacement],
    identity: IdentitySource,
) -> AttributeSet {
    let mut fetched = query.attributes.clone();

    for p in placement
        .iter()
        .filter(|p| p.stage == EvaluationStage::PostAggregation)
    {
        match p.kind {
            PredicateKind::MinQuality(_) => {
                fetched.insert(CallAttribute::DataTypeQuality);
            }
            PredicateKind::AnatOrigin => {
                fetched.insert(CallAttribute::AnatOriginOfLine);
            }
            PredicateKind::StageOrigin => {
                fetched.insert(CallAttribute::StageOriginOfLine);
            }
            PredicateKind::Observed => {
                fetched.insert(CallAttribute::ObservedData);
            }
            PredicateKind::GeneIds
            | PredicateKind::SpeciesIds
            | PredicateKind::Condition(_)
            | PredicateKind::ConditionIds => {}
        }
    }

    if fetched.contains(CallAttribute::ObservedData) {
        fetched.insert(CallAttribute::AnatOriginOfLine);
        fetched.insert(CallAttribute::StageOriginOfLine);
    }

    for key in &query.ordering {
        fetched.insert(key.attribute.required_field());
    }

    if identity == IdentitySource::Synthesized && fetched.contains(CallAttribute::Id) {
        fetched.insert(CallAttribute::GeneId);
        fetched.insert(CallAttribute::ConditionId);
    }

    fetched
}

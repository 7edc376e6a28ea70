//! Predicate evaluation
//!
//! Evaluates a filter set against a candidate call: a physical row before
//! aggregation, or an aggregated call after it. Predicates placed after
//! aggregation are skipped at row level. Exact match only, no coercion.

use std::collections::{BTreeMap, BTreeSet};

use super::group::FilterGroup;
use super::set::{FilterSet, PredicateKind, PredicateScope};
use crate::model::{ConditionId, ConditionParams, DataType, Evidence, GeneId, OriginOfLine};

/// The values predicates are evaluated against
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub gene_id: GeneId,
    pub condition_id: ConditionId,
    pub params: &'a ConditionParams,
    pub evidence: &'a BTreeMap<DataType, Evidence>,
    pub anat_origin: OriginOfLine,
    pub stage_origin: OriginOfLine,
}

/// Evaluates a filter set, honoring post-aggregation placement
#[derive(Debug, Clone)]
pub struct FilterMatcher<'a> {
    filters: &'a FilterSet,
    deferred: BTreeSet<(PredicateScope, PredicateKind)>,
}

impl<'a> FilterMatcher<'a> {
    /// Creates a matcher; `deferred` lists the predicates evaluated only
    /// after aggregation
    pub fn new(
        filters: &'a FilterSet,
        deferred: impl IntoIterator<Item = (PredicateScope, PredicateKind)>,
    ) -> Self {
        Self {
            filters,
            deferred: deferred.into_iter().collect(),
        }
    }

    /// Row-level check: promoted predicates AND any group's
    /// pre-aggregation predicates
    pub fn matches_row(&self, candidate: &Candidate<'_>) -> bool {
        self.matches(candidate, false)
    }

    /// Call-level check: promoted predicates AND any group's full
    /// conjunction
    pub fn matches_call(&self, candidate: &Candidate<'_>) -> bool {
        self.matches(candidate, true)
    }

    fn matches(&self, candidate: &Candidate<'_>, aggregated: bool) -> bool {
        let promoted = self.filters.promoted();
        if let Some(genes) = &promoted.gene_ids {
            if !genes.contains(&candidate.gene_id) {
                return false;
            }
        }
        if let Some(species) = &promoted.species_ids {
            if !species.contains(&candidate.params.species_id) {
                return false;
            }
        }

        self.filters
            .local_groups()
            .iter()
            .enumerate()
            .any(|(index, group)| {
                let scope = PredicateScope::Group(index);
                predicates_of(group).all(|kind| {
                    if !aggregated && self.deferred.contains(&(scope, kind)) {
                        return true;
                    }
                    holds(group, kind, candidate)
                })
            })
    }
}

/// Predicates carried by a (local) group
fn predicates_of(group: &FilterGroup) -> impl Iterator<Item = PredicateKind> + '_ {
    let origins = group.origins();
    let fixed = [
        (!group.gene_ids().is_empty()).then_some(PredicateKind::GeneIds),
        (!group.species_ids().is_empty()).then_some(PredicateKind::SpeciesIds),
        (!group.resolved_condition_ids().is_empty()).then_some(PredicateKind::ConditionIds),
        (!origins.anat_origins.is_empty()).then_some(PredicateKind::AnatOrigin),
        (!origins.stage_origins.is_empty()).then_some(PredicateKind::StageOrigin),
        origins.observed.map(|_| PredicateKind::Observed),
    ];
    fixed
        .into_iter()
        .flatten()
        .chain(group.conditions().dimensions().map(PredicateKind::Condition))
        .chain(group.min_qualities().keys().map(|dt| PredicateKind::MinQuality(*dt)))
}

fn holds(group: &FilterGroup, kind: PredicateKind, candidate: &Candidate<'_>) -> bool {
    match kind {
        PredicateKind::GeneIds => group.gene_ids().contains(&candidate.gene_id),
        PredicateKind::SpeciesIds => group.species_ids().contains(&candidate.params.species_id),
        PredicateKind::Condition(dim) => group
            .conditions()
            .matches_dimension(dim, candidate.params),
        PredicateKind::ConditionIds => group
            .resolved_condition_ids()
            .contains(&candidate.condition_id),
        PredicateKind::MinQuality(data_type) => group.quality_holds(data_type, candidate.evidence),
        PredicateKind::AnatOrigin => group.origins().matches_anat(candidate.anat_origin),
        PredicateKind::StageOrigin => group.origins().matches_stage(candidate.stage_origin),
        PredicateKind::Observed => group
            .origins()
            .matches_observed(candidate.anat_origin, candidate.stage_origin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataQuality;

    fn evidence(entries: &[(DataType, DataQuality)]) -> BTreeMap<DataType, Evidence> {
        entries
            .iter()
            .map(|(dt, q)| (*dt, Evidence::new(*q)))
            .collect()
    }

    fn candidate<'a>(
        gene_id: GeneId,
        params: &'a ConditionParams,
        evidence: &'a BTreeMap<DataType, Evidence>,
    ) -> Candidate<'a> {
        Candidate {
            gene_id,
            condition_id: 1,
            params,
            evidence,
            anat_origin: OriginOfLine::Own,
            stage_origin: OriginOfLine::Own,
        }
    }

    #[test]
    fn test_groups_are_ored() {
        let set = FilterSet::new(vec![
            FilterGroup::new().with_gene_ids([1]).with_anat_entity_ids(["A1"]),
            FilterGroup::new().with_gene_ids([2]).with_anat_entity_ids(["A2"]),
        ])
        .unwrap();
        let matcher = FilterMatcher::new(&set, []);
        let ev = evidence(&[]);

        let a1 = ConditionParams::new(9606).with_anat_entity("A1");
        let a2 = ConditionParams::new(9606).with_anat_entity("A2");
        assert!(matcher.matches_row(&candidate(1, &a1, &ev)));
        assert!(matcher.matches_row(&candidate(2, &a2, &ev)));
        assert!(!matcher.matches_row(&candidate(1, &a2, &ev)));
    }

    #[test]
    fn test_promoted_predicate_applies_to_every_group() {
        let set = FilterSet::new(vec![
            FilterGroup::new().with_gene_ids([7, 42]).with_anat_entity_ids(["A1"]),
            FilterGroup::new().with_gene_ids([7, 42]).with_anat_entity_ids(["A2"]),
        ])
        .unwrap();
        let matcher = FilterMatcher::new(&set, []);
        let ev = evidence(&[]);
        let a2 = ConditionParams::new(9606).with_anat_entity("A2");

        assert!(matcher.matches_row(&candidate(42, &a2, &ev)));
        assert!(!matcher.matches_row(&candidate(8, &a2, &ev)));
    }

    #[test]
    fn test_deferred_predicates_skipped_at_row_level() {
        let set = FilterSet::new(vec![FilterGroup::new()
            .with_gene_ids([1])
            .with_min_quality(DataType::RnaSeq, DataQuality::High)
            .with_min_quality(DataType::Affymetrix, DataQuality::High)])
        .unwrap();
        let deferred = [
            (PredicateScope::Group(0), PredicateKind::MinQuality(DataType::RnaSeq)),
            (PredicateScope::Group(0), PredicateKind::MinQuality(DataType::Affymetrix)),
        ];
        let matcher = FilterMatcher::new(&set, deferred);
        let params = ConditionParams::new(9606);

        // One row per data type: neither satisfies both predicates.
        let rna_only = evidence(&[(DataType::RnaSeq, DataQuality::High)]);
        assert!(matcher.matches_row(&candidate(1, &params, &rna_only)));
        assert!(!matcher.matches_call(&candidate(1, &params, &rna_only)));

        // The aggregated call holds both.
        let both = evidence(&[
            (DataType::RnaSeq, DataQuality::High),
            (DataType::Affymetrix, DataQuality::High),
        ]);
        assert!(matcher.matches_call(&candidate(1, &params, &both)));
    }

    #[test]
    fn test_observed_predicate() {
        let set = FilterSet::new(vec![FilterGroup::new().with_gene_ids([1]).with_observed(true)])
            .unwrap();
        let matcher = FilterMatcher::new(&set, []);
        let params = ConditionParams::new(9606);
        let ev = evidence(&[]);

        let mut c = candidate(1, &params, &ev);
        assert!(matcher.matches_call(&c));
        c.stage_origin = OriginOfLine::Descendant;
        assert!(!matcher.matches_call(&c));
    }
}

//! Filter sets
//!
//! A filter set is a disjunction of filter groups. Construction validates
//! the set and factors out predicates shared by every group: when every
//! group carries the same non-empty gene-id set (or species-id set), that
//! predicate is hoisted to a single global predicate and removed from the
//! per-group predicates. The original groups are kept for inspection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::group::FilterGroup;
use crate::model::{ConditionDimension, ConditionId, DataType, GeneId, SpeciesId};
use crate::planner::{PlannerError, PlannerResult};

/// Where a predicate lives after promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateScope {
    /// Hoisted, evaluated once for every group
    Global,
    /// Local to the group at this index
    Group(usize),
}

/// One predicate of a filter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    GeneIds,
    SpeciesIds,
    Condition(ConditionDimension),
    ConditionIds,
    MinQuality(DataType),
    AnatOrigin,
    StageOrigin,
    Observed,
}

impl PredicateKind {
    /// True for predicates on values derived by propagation
    pub fn is_origin(&self) -> bool {
        matches!(
            self,
            PredicateKind::AnatOrigin | PredicateKind::StageOrigin | PredicateKind::Observed
        )
    }
}

/// Predicates hoisted out of every group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromotedPredicates {
    pub gene_ids: Option<BTreeSet<GeneId>>,
    pub species_ids: Option<BTreeSet<SpeciesId>>,
}

impl PromotedPredicates {
    pub fn is_empty(&self) -> bool {
        self.gene_ids.is_none() && self.species_ids.is_none()
    }
}

/// A disjunction of filter groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FilterGroup>", into = "Vec<FilterGroup>")]
pub struct FilterSet {
    groups: Vec<FilterGroup>,
    local: Vec<FilterGroup>,
    promoted: PromotedPredicates,
    factored: bool,
}

impl FilterSet {
    /// Builds a filter set, promoting predicates shared by every group.
    ///
    /// Fails when there is no group, or when a group restricts neither
    /// genes nor species: such a group would select the whole store.
    pub fn new(groups: Vec<FilterGroup>) -> PlannerResult<Self> {
        Self::build(groups, true)
    }

    /// Builds a filter set without promotion
    pub fn unfactored(groups: Vec<FilterGroup>) -> PlannerResult<Self> {
        Self::build(groups, false)
    }

    /// Builds a filter set from a single group
    pub fn single(group: FilterGroup) -> PlannerResult<Self> {
        Self::new(vec![group])
    }

    fn build(groups: Vec<FilterGroup>, promote: bool) -> PlannerResult<Self> {
        if groups.is_empty() {
            return Err(PlannerError::invalid_filter_set(
                "Filter set has no filter group",
            ));
        }
        if let Some(index) = groups.iter().position(|g| !g.has_identifying_predicate()) {
            return Err(PlannerError::invalid_filter_set(format!(
                "Filter group {} restricts neither genes nor species",
                index
            )));
        }

        let promoted = if promote {
            PromotedPredicates {
                gene_ids: shared(&groups, FilterGroup::gene_ids),
                species_ids: shared(&groups, FilterGroup::species_ids),
            }
        } else {
            PromotedPredicates::default()
        };

        let local = groups
            .iter()
            .map(|group| {
                let mut local = group.clone();
                if promoted.gene_ids.is_some() {
                    local.clear_gene_ids();
                }
                if promoted.species_ids.is_some() {
                    local.clear_species_ids();
                }
                local
            })
            .collect();

        Ok(Self {
            groups,
            local,
            promoted,
            factored: promote,
        })
    }

    /// Attaches pre-resolved condition ids to each group.
    ///
    /// The key set of `resolved` must be exactly the group indexes, and no
    /// group may resolve to an empty set.
    pub fn with_resolved_conditions(
        self,
        resolved: BTreeMap<usize, BTreeSet<ConditionId>>,
    ) -> PlannerResult<Self> {
        let expected: BTreeSet<usize> = (0..self.groups.len()).collect();
        let actual: BTreeSet<usize> = resolved.keys().copied().collect();
        if expected != actual {
            return Err(PlannerError::invalid_filter_set(format!(
                "Resolved condition map covers groups {:?}, filter set has groups {:?}",
                actual, expected
            )));
        }
        if let Some((index, _)) = resolved.iter().find(|(_, ids)| ids.is_empty()) {
            return Err(PlannerError::invalid_filter_set(format!(
                "Filter group {} resolved to no condition",
                index
            )));
        }

        let promote = self.factored;
        let mut groups = self.groups;
        for (index, ids) in resolved {
            groups[index].set_resolved_condition_ids(ids);
        }
        Self::build(groups, promote)
    }

    /// Groups as supplied by the caller
    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    /// Groups with promoted predicates removed
    pub fn local_groups(&self) -> &[FilterGroup] {
        &self.local
    }

    pub fn promoted(&self) -> &PromotedPredicates {
        &self.promoted
    }

    /// False for sets built with [`FilterSet::unfactored`]
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every predicate of the set, after promotion, in a stable order
    pub fn predicates(&self) -> Vec<(PredicateScope, PredicateKind)> {
        let mut predicates = Vec::new();
        if self.promoted.gene_ids.is_some() {
            predicates.push((PredicateScope::Global, PredicateKind::GeneIds));
        }
        if self.promoted.species_ids.is_some() {
            predicates.push((PredicateScope::Global, PredicateKind::SpeciesIds));
        }
        for (index, group) in self.local.iter().enumerate() {
            let scope = PredicateScope::Group(index);
            if !group.gene_ids().is_empty() {
                predicates.push((scope, PredicateKind::GeneIds));
            }
            if !group.species_ids().is_empty() {
                predicates.push((scope, PredicateKind::SpeciesIds));
            }
            for dim in group.conditions().dimensions() {
                predicates.push((scope, PredicateKind::Condition(dim)));
            }
            if !group.resolved_condition_ids().is_empty() {
                predicates.push((scope, PredicateKind::ConditionIds));
            }
            for data_type in group.min_qualities().keys() {
                predicates.push((scope, PredicateKind::MinQuality(*data_type)));
            }
            let origins = group.origins();
            if !origins.anat_origins.is_empty() {
                predicates.push((scope, PredicateKind::AnatOrigin));
            }
            if !origins.stage_origins.is_empty() {
                predicates.push((scope, PredicateKind::StageOrigin));
            }
            if origins.observed.is_some() {
                predicates.push((scope, PredicateKind::Observed));
            }
        }
        predicates
    }

    /// Union of the gene ids of every group, when every group restricts genes
    pub fn gene_id_bound(&self) -> Option<BTreeSet<GeneId>> {
        if self.groups.iter().any(|g| g.gene_ids().is_empty()) {
            return None;
        }
        Some(
            self.groups
                .iter()
                .flat_map(|g| g.gene_ids().iter().copied())
                .collect(),
        )
    }

    /// Condition dimensions constrained by any group
    pub fn constrained_dimensions(&self) -> BTreeSet<ConditionDimension> {
        self.groups
            .iter()
            .flat_map(|g| g.conditions().dimensions())
            .collect()
    }

    /// True when some group admits calls of this gene in this species
    pub fn admits_gene(&self, gene_id: GeneId, species_id: SpeciesId) -> bool {
        self.groups.iter().any(|g| {
            (g.gene_ids().is_empty() || g.gene_ids().contains(&gene_id))
                && (g.species_ids().is_empty() || g.species_ids().contains(&species_id))
        })
    }
}

/// The set shared by every group, if non-empty and identical across groups
fn shared<T: Ord + Clone>(
    groups: &[FilterGroup],
    get: fn(&FilterGroup) -> &BTreeSet<T>,
) -> Option<BTreeSet<T>> {
    let first = get(groups.first()?);
    if first.is_empty() || groups.iter().any(|g| get(g) != first) {
        return None;
    }
    Some(first.clone())
}

impl TryFrom<Vec<FilterGroup>> for FilterSet {
    type Error = PlannerError;

    fn try_from(groups: Vec<FilterGroup>) -> Result<Self, Self::Error> {
        FilterSet::new(groups)
    }
}

impl From<FilterSet> for Vec<FilterGroup> {
    fn from(set: FilterSet) -> Self {
        set.groups
    }
}

//! Filter groups
//!
//! A filter group is a conjunction of predicates. An empty predicate set
//! (no gene ids, no anatomical entities, ...) leaves that aspect
//! unconstrained. Groups are built once by the caller and never mutated
//! after they are handed to a `FilterSet`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{
    observed, ConditionDimension, ConditionId, ConditionParams, DataQuality, DataType, Evidence,
    GeneId, OriginOfLine, SpeciesId,
};

/// Allowed values per condition dimension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionFilter(BTreeMap<ConditionDimension, BTreeSet<String>>);

impl ConditionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `ids` for `dim`, added to any ids already allowed
    pub fn with_ids<I, S>(mut self, dim: ConditionDimension, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.0.entry(dim).or_default();
        entry.extend(ids.into_iter().map(Into::into));
        if entry.is_empty() {
            self.0.remove(&dim);
        }
        self
    }

    /// Ids allowed for `dim`; empty when unconstrained
    pub fn ids(&self, dim: ConditionDimension) -> Option<&BTreeSet<String>> {
        self.0.get(&dim)
    }

    /// Constrained dimensions
    pub fn dimensions(&self) -> impl Iterator<Item = ConditionDimension> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks one constrained dimension against the condition parameters
    pub fn matches_dimension(&self, dim: ConditionDimension, params: &ConditionParams) -> bool {
        match self.0.get(&dim) {
            Some(ids) => params.value(dim).is_some_and(|v| ids.contains(v)),
            None => true,
        }
    }

    pub fn matches(&self, params: &ConditionParams) -> bool {
        self.dimensions()
            .all(|dim| self.matches_dimension(dim, params))
    }
}

/// Predicates on the derived origin-of-line and observed flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginFilter {
    pub anat_origins: BTreeSet<OriginOfLine>,
    pub stage_origins: BTreeSet<OriginOfLine>,
    pub observed: Option<bool>,
}

impl OriginFilter {
    pub fn is_empty(&self) -> bool {
        self.anat_origins.is_empty() && self.stage_origins.is_empty() && self.observed.is_none()
    }

    pub fn matches_anat(&self, origin: OriginOfLine) -> bool {
        self.anat_origins.is_empty() || self.anat_origins.contains(&origin)
    }

    pub fn matches_stage(&self, origin: OriginOfLine) -> bool {
        self.stage_origins.is_empty() || self.stage_origins.contains(&origin)
    }

    pub fn matches_observed(&self, anat: OriginOfLine, stage: OriginOfLine) -> bool {
        self.observed.map_or(true, |wanted| observed(anat, stage) == wanted)
    }
}

/// A conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterGroup {
    gene_ids: BTreeSet<GeneId>,
    species_ids: BTreeSet<SpeciesId>,
    conditions: ConditionFilter,
    /// Set only through `FilterSet::with_resolved_conditions`
    #[serde(skip_deserializing)]
    condition_ids: BTreeSet<ConditionId>,
    min_qualities: BTreeMap<DataType, DataQuality>,
    origins: OriginFilter,
}

impl FilterGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gene_ids(mut self, ids: impl IntoIterator<Item = GeneId>) -> Self {
        self.gene_ids.extend(ids);
        self
    }

    pub fn with_species_ids(mut self, ids: impl IntoIterator<Item = SpeciesId>) -> Self {
        self.species_ids.extend(ids);
        self
    }

    pub fn with_condition_ids<I, S>(mut self, dim: ConditionDimension, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = self.conditions.with_ids(dim, ids);
        self
    }

    pub fn with_anat_entity_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_condition_ids(ConditionDimension::Anatomy, ids)
    }

    pub fn with_stage_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_condition_ids(ConditionDimension::Stage, ids)
    }

    /// Requires evidence of `data_type` at `quality` or better.
    ///
    /// Two predicates on the same data type keep the stricter one.
    pub fn with_min_quality(mut self, data_type: DataType, quality: DataQuality) -> Self {
        let entry = self.min_qualities.entry(data_type).or_insert(quality);
        *entry = (*entry).max(quality);
        self
    }

    pub fn with_anat_origins(mut self, origins: impl IntoIterator<Item = OriginOfLine>) -> Self {
        self.origins.anat_origins.extend(origins);
        self
    }

    pub fn with_stage_origins(mut self, origins: impl IntoIterator<Item = OriginOfLine>) -> Self {
        self.origins.stage_origins.extend(origins);
        self
    }

    pub fn with_observed(mut self, observed: bool) -> Self {
        self.origins.observed = Some(observed);
        self
    }

    pub fn gene_ids(&self) -> &BTreeSet<GeneId> {
        &self.gene_ids
    }

    pub fn species_ids(&self) -> &BTreeSet<SpeciesId> {
        &self.species_ids
    }

    pub fn conditions(&self) -> &ConditionFilter {
        &self.conditions
    }

    /// Pre-resolved condition ids; empty when none were attached
    pub fn resolved_condition_ids(&self) -> &BTreeSet<ConditionId> {
        &self.condition_ids
    }

    pub fn min_qualities(&self) -> &BTreeMap<DataType, DataQuality> {
        &self.min_qualities
    }

    pub fn origins(&self) -> &OriginFilter {
        &self.origins
    }

    /// True when the group restricts genes or species
    pub fn has_identifying_predicate(&self) -> bool {
        !self.gene_ids.is_empty() || !self.species_ids.is_empty()
    }

    /// True when the group ANDs minimum qualities of two or more data types
    pub fn mixes_data_types(&self) -> bool {
        self.min_qualities.len() >= 2
    }

    pub fn has_origin_predicate(&self) -> bool {
        !self.origins.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_ids.is_empty()
            && self.species_ids.is_empty()
            && self.conditions.is_empty()
            && self.condition_ids.is_empty()
            && self.min_qualities.is_empty()
            && self.origins.is_empty()
    }

    /// Checks one minimum-quality predicate against a piece of evidence
    pub fn quality_holds(
        &self,
        data_type: DataType,
        evidence: &BTreeMap<DataType, Evidence>,
    ) -> bool {
        match self.min_qualities.get(&data_type) {
            Some(min) => evidence.get(&data_type).is_some_and(|e| e.quality >= *min),
            None => true,
        }
    }

    pub(crate) fn set_resolved_condition_ids(&mut self, ids: BTreeSet<ConditionId>) {
        self.condition_ids = ids;
    }

    pub(crate) fn clear_gene_ids(&mut self) {
        self.gene_ids.clear();
    }

    pub(crate) fn clear_species_ids(&mut self) {
        self.species_ids.clear();
    }
}

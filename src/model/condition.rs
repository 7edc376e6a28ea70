//! Conditions and condition dimensions
//!
//! A condition is the tuple (anatomical entity, stage, cell type, sex,
//! strain, species). Each condition collapses to exactly one mapped
//! condition, the least granular one used by aggregate tables; a condition
//! that is already minimal maps to itself.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Gene identifier
pub type GeneId = u32;
/// Species identifier
pub type SpeciesId = u32;
/// Condition identifier
pub type ConditionId = u32;

/// A condition parameter that can be requested and propagated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionDimension {
    Anatomy,
    Stage,
    CellType,
    Sex,
    Strain,
}

impl ConditionDimension {
    pub const ALL: [ConditionDimension; 5] = [
        ConditionDimension::Anatomy,
        ConditionDimension::Stage,
        ConditionDimension::CellType,
        ConditionDimension::Sex,
        ConditionDimension::Strain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionDimension::Anatomy => "anatomy",
            ConditionDimension::Stage => "stage",
            ConditionDimension::CellType => "cell_type",
            ConditionDimension::Sex => "sex",
            ConditionDimension::Strain => "strain",
        }
    }
}

impl fmt::Display for ConditionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a dimension set from a list of dimensions
pub fn dimensions(dims: impl IntoIterator<Item = ConditionDimension>) -> BTreeSet<ConditionDimension> {
    dims.into_iter().collect()
}

/// Parameter values of a condition.
///
/// A `None` parameter is not part of the condition's granularity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionParams {
    pub species_id: SpeciesId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anat_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain_id: Option<String>,
}

impl ConditionParams {
    pub fn new(species_id: SpeciesId) -> Self {
        Self {
            species_id,
            anat_entity_id: None,
            stage_id: None,
            cell_type_id: None,
            sex_id: None,
            strain_id: None,
        }
    }

    pub fn with_anat_entity(self, id: impl Into<String>) -> Self {
        self.with_value(ConditionDimension::Anatomy, Some(id.into()))
    }

    pub fn with_stage(self, id: impl Into<String>) -> Self {
        self.with_value(ConditionDimension::Stage, Some(id.into()))
    }

    pub fn with_cell_type(self, id: impl Into<String>) -> Self {
        self.with_value(ConditionDimension::CellType, Some(id.into()))
    }

    pub fn with_sex(self, id: impl Into<String>) -> Self {
        self.with_value(ConditionDimension::Sex, Some(id.into()))
    }

    pub fn with_strain(self, id: impl Into<String>) -> Self {
        self.with_value(ConditionDimension::Strain, Some(id.into()))
    }

    /// Value of one dimension
    pub fn value(&self, dim: ConditionDimension) -> Option<&str> {
        match dim {
            ConditionDimension::Anatomy => self.anat_entity_id.as_deref(),
            ConditionDimension::Stage => self.stage_id.as_deref(),
            ConditionDimension::CellType => self.cell_type_id.as_deref(),
            ConditionDimension::Sex => self.sex_id.as_deref(),
            ConditionDimension::Strain => self.strain_id.as_deref(),
        }
    }

    /// Returns a copy with one dimension replaced
    pub fn with_value(mut self, dim: ConditionDimension, value: Option<String>) -> Self {
        let slot = match dim {
            ConditionDimension::Anatomy => &mut self.anat_entity_id,
            ConditionDimension::Stage => &mut self.stage_id,
            ConditionDimension::CellType => &mut self.cell_type_id,
            ConditionDimension::Sex => &mut self.sex_id,
            ConditionDimension::Strain => &mut self.strain_id,
        };
        *slot = value;
        self
    }

    /// Collapses the parameters to the given dimensions; others become `None`.
    pub fn project(&self, dims: &BTreeSet<ConditionDimension>) -> ConditionParams {
        ConditionDimension::ALL
            .into_iter()
            .fold(ConditionParams::new(self.species_id), |params, dim| {
                if dims.contains(&dim) {
                    params.with_value(dim, self.value(dim).map(str::to_string))
                } else {
                    params
                }
            })
    }

    /// Dimensions carrying a value
    pub fn dimensions(&self) -> BTreeSet<ConditionDimension> {
        ConditionDimension::ALL
            .into_iter()
            .filter(|dim| self.value(*dim).is_some())
            .collect()
    }
}

/// A stored condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    #[serde(flatten)]
    pub params: ConditionParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mapped_condition_id: Option<ConditionId>,
}

impl Condition {
    /// Creates a condition at minimal granularity (maps to itself)
    pub fn new(id: ConditionId, params: ConditionParams) -> Self {
        Self {
            id,
            params,
            mapped_condition_id: None,
        }
    }

    /// Sets the condition this one collapses to
    pub fn with_mapped_condition_id(mut self, mapped: ConditionId) -> Self {
        self.mapped_condition_id = (mapped != self.id).then_some(mapped);
        self
    }

    /// The least granular condition this one collapses to
    pub fn mapped_condition_id(&self) -> ConditionId {
        self.mapped_condition_id.unwrap_or(self.id)
    }

    pub fn is_minimal_granularity(&self) -> bool {
        self.mapped_condition_id() == self.id
    }

    pub fn species_id(&self) -> SpeciesId {
        self.params.species_id
    }

    pub fn anat_entity_id(&self) -> Option<&str> {
        self.params.anat_entity_id.as_deref()
    }

    pub fn stage_id(&self) -> Option<&str> {
        self.params.stage_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConditionParams {
        ConditionParams::new(9606)
            .with_anat_entity("UBERON:0000955")
            .with_stage("HsapDv:0000087")
            .with_sex("female")
    }

    #[test]
    fn test_project_keeps_requested_dimensions() {
        let projected = params().project(&dimensions([ConditionDimension::Anatomy]));
        assert_eq!(projected.anat_entity_id.as_deref(), Some("UBERON:0000955"));
        assert_eq!(projected.stage_id, None);
        assert_eq!(projected.sex_id, None);
        assert_eq!(projected.species_id, 9606);
    }

    #[test]
    fn test_dimensions_with_values() {
        assert_eq!(
            params().dimensions(),
            dimensions([
                ConditionDimension::Anatomy,
                ConditionDimension::Stage,
                ConditionDimension::Sex
            ])
        );
    }

    #[test]
    fn test_every_dimension_reads_its_own_slot() {
        let full = params().with_cell_type("CL:0000540").with_strain("C57BL/6");
        assert_eq!(full.value(ConditionDimension::CellType), Some("CL:0000540"));
        assert_eq!(full.value(ConditionDimension::Strain), Some("C57BL/6"));
        assert_eq!(full.dimensions().len(), ConditionDimension::ALL.len());

        let projected = full.project(&dimensions([
            ConditionDimension::CellType,
            ConditionDimension::Strain,
        ]));
        assert_eq!(projected.cell_type_id.as_deref(), Some("CL:0000540"));
        assert_eq!(projected.strain_id.as_deref(), Some("C57BL/6"));
        assert_eq!(projected.anat_entity_id, None);
        assert_eq!(projected.sex_id, None);
    }

    #[test]
    fn test_mapped_condition_defaults_to_self() {
        let cond = Condition::new(7, params());
        assert_eq!(cond.mapped_condition_id(), 7);
        assert!(cond.is_minimal_granularity());

        let cond = cond.with_mapped_condition_id(3);
        assert_eq!(cond.mapped_condition_id(), 3);
        assert!(!cond.is_minimal_granularity());

        let cond = cond.with_mapped_condition_id(7);
        assert!(cond.is_minimal_granularity());
    }

    #[test]
    fn test_condition_json_roundtrip_flattens_params() {
        let cond = Condition::new(1, ConditionParams::new(10090).with_anat_entity("A1"));
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["anat_entity_id"], "A1");
        assert!(json.get("mapped_condition_id").is_none());

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }
}

//! Condition-parameter combination registry
//!
//! Maps a set of requested condition dimensions to the physical binding
//! used to store and query calls over exactly that set. Resolution is an
//! exact match on the set: anything unregistered fails closed rather than
//! falling back to a superset.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::ConditionDimension;
use crate::planner::{PlannerError, PlannerResult};

/// Physical tables backing one combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Binding {
    /// Condition table
    pub condition_table: &'static str,
    /// Raw (non-propagated) call table
    pub raw_call_table: &'static str,
    /// Aggregated (anatomy-propagated) call table
    pub global_call_table: &'static str,
    /// Link table from aggregated calls to raw calls
    pub link_table: &'static str,
}

/// A registered combination: a dimension set and its binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConditionDimensionCombination {
    name: &'static str,
    dimensions: BTreeSet<ConditionDimension>,
    binding: Binding,
}

impl ConditionDimensionCombination {
    pub fn new(
        name: &'static str,
        dimensions: impl IntoIterator<Item = ConditionDimension>,
        binding: Binding,
    ) -> Self {
        Self {
            name,
            dimensions: dimensions.into_iter().collect(),
            binding,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dimensions(&self) -> &BTreeSet<ConditionDimension> {
        &self.dimensions
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn covers(&self, dim: ConditionDimension) -> bool {
        self.dimensions.contains(&dim)
    }
}

/// Name of the anatomy-only combination in the reference configuration
pub const ANATOMY: &str = "anatomy";
/// Name of the anatomy + stage combination in the reference configuration
pub const ANATOMY_STAGE: &str = "anatomy_stage";

/// Registry of condition-parameter combinations
#[derive(Debug, Clone, Default)]
pub struct CombinationRegistry {
    entries: Vec<ConditionDimensionCombination>,
}

impl CombinationRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference configuration: {anatomy} and {anatomy, stage}
    pub fn reference() -> Self {
        let entries = [
            ConditionDimensionCombination::new(
                ANATOMY,
                [ConditionDimension::Anatomy],
                Binding {
                    condition_table: "anat_entity_cond",
                    raw_call_table: "anat_entity_expression",
                    global_call_table: "anat_entity_global_expression",
                    link_table: "anat_entity_global_expression_to_expression",
                },
            ),
            ConditionDimensionCombination::new(
                ANATOMY_STAGE,
                [ConditionDimension::Anatomy, ConditionDimension::Stage],
                Binding {
                    condition_table: "anat_entity_stage_cond",
                    raw_call_table: "anat_entity_stage_expression",
                    global_call_table: "anat_entity_stage_global_expression",
                    link_table: "anat_entity_stage_global_expression_to_expression",
                },
            ),
        ];
        Self {
            entries: Vec::from(entries),
        }
    }

    /// Registers a combination.
    ///
    /// Rejects an empty dimension set and any set already registered, so a
    /// new entry never changes how a previously valid set resolves.
    pub fn register(&mut self, entry: ConditionDimensionCombination) -> PlannerResult<()> {
        if entry.dimensions.is_empty() {
            return Err(PlannerError::invalid_request(format!(
                "Combination '{}' has no dimension",
                entry.name
            )));
        }
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.dimensions == entry.dimensions || e.name == entry.name)
        {
            return Err(PlannerError::invalid_request(format!(
                "Combination '{}' conflicts with registered combination '{}'",
                entry.name, existing.name
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Resolves the combination for exactly this dimension set
    pub fn resolve(
        &self,
        dims: &BTreeSet<ConditionDimension>,
    ) -> PlannerResult<&ConditionDimensionCombination> {
        self.entries
            .iter()
            .find(|e| &e.dimensions == dims)
            .ok_or_else(|| PlannerError::unsupported_combination(dims))
    }

    /// Looks a combination up by name
    pub fn get(&self, name: &str) -> Option<&ConditionDimensionCombination> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConditionDimensionCombination> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

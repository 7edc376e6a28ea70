//! Call requests
//!
//! `CallQuery` is the validated request the planner consumes.
//! `CallRequest` is its JSON form, with attribute names as plain strings so
//! unknown names surface as `EXPR_UNRECOGNIZED_FIELD` rather than as a
//! JSON error.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::errors::PlannerResult;
use crate::filter::{FilterGroup, FilterSet};
use crate::model::{
    AttributeSet, CallAttribute, CallOrdering, ConditionDimension, ConditionId, DataType,
};

/// A request for expression calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallQuery {
    /// Call filter
    pub filters: FilterSet,
    /// Requested attributes
    pub attributes: AttributeSet,
    /// Data types whose evidence is considered; empty means all
    pub data_types: BTreeSet<DataType>,
    /// Ordering keys, most significant first
    pub ordering: Vec<CallOrdering>,
    /// Propagate evidence from anatomical substructures
    pub sub_anat: bool,
    /// Propagate evidence from developmental sub-stages
    pub sub_stage: bool,
    /// Condition dimensions the calls are requested over
    pub dimensions: BTreeSet<ConditionDimension>,
}

impl CallQuery {
    /// Creates a request for every attribute over the given dimensions,
    /// without propagation
    pub fn new(
        filters: FilterSet,
        dimensions: impl IntoIterator<Item = ConditionDimension>,
    ) -> Self {
        Self {
            filters,
            attributes: AttributeSet::all(),
            data_types: BTreeSet::new(),
            ordering: Vec::new(),
            sub_anat: false,
            sub_stage: false,
            dimensions: dimensions.into_iter().collect(),
        }
    }

    pub fn with_attributes(mut self, attributes: impl Into<AttributeSet>) -> Self {
        self.attributes = attributes.into();
        self
    }

    pub fn with_data_types(mut self, data_types: impl IntoIterator<Item = DataType>) -> Self {
        self.data_types = data_types.into_iter().collect();
        self
    }

    pub fn with_ordering(mut self, ordering: CallOrdering) -> Self {
        self.ordering.push(ordering);
        self
    }

    pub fn with_sub_anat(mut self, sub_anat: bool) -> Self {
        self.sub_anat = sub_anat;
        self
    }

    pub fn with_sub_stage(mut self, sub_stage: bool) -> Self {
        self.sub_stage = sub_stage;
        self
    }

    pub fn requests(&self, attr: CallAttribute) -> bool {
        self.attributes.contains(attr)
    }

    /// Data types actually considered
    pub fn effective_data_types(&self) -> BTreeSet<DataType> {
        if self.data_types.is_empty() {
            DataType::ALL.into_iter().collect()
        } else {
            self.data_types.clone()
        }
    }
}

/// JSON form of a call request
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallRequest {
    pub filters: Vec<FilterGroup>,
    /// Attribute names; absent means every attribute
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
    #[serde(default)]
    pub data_types: Vec<DataType>,
    #[serde(default)]
    pub ordering: Vec<CallOrdering>,
    #[serde(default)]
    pub sub_anat: bool,
    #[serde(default)]
    pub sub_stage: bool,
    pub dimensions: Vec<ConditionDimension>,
    /// Pre-resolved condition ids per group index
    #[serde(default)]
    pub resolved_conditions: Option<BTreeMap<usize, BTreeSet<ConditionId>>>,
}

impl CallRequest {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Validates the request into a `CallQuery`
    pub fn into_query(self) -> PlannerResult<CallQuery> {
        let mut filters = FilterSet::new(self.filters)?;
        if let Some(resolved) = self.resolved_conditions {
            filters = filters.with_resolved_conditions(resolved)?;
        }

        let attributes = match self.attributes {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<CallAttribute>())
                .collect::<PlannerResult<AttributeSet>>()?,
            None => AttributeSet::all(),
        };

        Ok(CallQuery {
            filters,
            attributes,
            data_types: self.data_types.into_iter().collect(),
            ordering: self.ordering,
            sub_anat: self.sub_anat,
            sub_stage: self.sub_stage,
            dimensions: self.dimensions.into_iter().collect(),
        })
    }
}

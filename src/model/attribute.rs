//! Requestable call attributes and orderings
//!
//! `CallAttribute` is a closed enumeration: every rule that inspects
//! attributes matches it exhaustively, so adding a field forces every rule
//! to decide what to do with it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::planner::PlannerError;

/// A field of a call that can be requested or derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallAttribute {
    Id,
    GeneId,
    ConditionId,
    DataTypeQuality,
    DataTypeRank,
    AnatOriginOfLine,
    StageOriginOfLine,
    ObservedData,
    MeanRank,
}

impl CallAttribute {
    pub const ALL: [CallAttribute; 9] = [
        CallAttribute::Id,
        CallAttribute::GeneId,
        CallAttribute::ConditionId,
        CallAttribute::DataTypeQuality,
        CallAttribute::DataTypeRank,
        CallAttribute::AnatOriginOfLine,
        CallAttribute::StageOriginOfLine,
        CallAttribute::ObservedData,
        CallAttribute::MeanRank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallAttribute::Id => "id",
            CallAttribute::GeneId => "gene_id",
            CallAttribute::ConditionId => "condition_id",
            CallAttribute::DataTypeQuality => "data_type_quality",
            CallAttribute::DataTypeRank => "data_type_rank",
            CallAttribute::AnatOriginOfLine => "anat_origin_of_line",
            CallAttribute::StageOriginOfLine => "stage_origin_of_line",
            CallAttribute::ObservedData => "observed_data",
            CallAttribute::MeanRank => "mean_rank",
        }
    }

    /// True when the value of this attribute for a propagated call is a
    /// best-of over every row collapsing into the call, so it cannot be
    /// read from a single row under sub-stage propagation.
    pub fn needs_aggregation(&self, sub_anat: bool) -> bool {
        match self {
            CallAttribute::Id | CallAttribute::GeneId | CallAttribute::ConditionId => false,
            CallAttribute::DataTypeQuality
            | CallAttribute::DataTypeRank
            | CallAttribute::StageOriginOfLine
            | CallAttribute::ObservedData
            | CallAttribute::MeanRank => true,
            CallAttribute::AnatOriginOfLine => sub_anat,
        }
    }
}

impl fmt::Display for CallAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallAttribute {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallAttribute::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| PlannerError::unrecognized_field(s))
    }
}

/// A set of call attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeSet<CallAttribute>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attribute
    pub fn all() -> Self {
        CallAttribute::ALL.into_iter().collect()
    }

    /// Parses a comma-separated attribute list
    pub fn parse_list(list: &str) -> Result<Self, PlannerError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(CallAttribute::from_str)
            .collect()
    }

    pub fn with(mut self, attr: CallAttribute) -> Self {
        self.0.insert(attr);
        self
    }

    pub fn insert(&mut self, attr: CallAttribute) -> bool {
        self.0.insert(attr)
    }

    pub fn contains(&self, attr: CallAttribute) -> bool {
        self.0.contains(&attr)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CallAttribute> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<CallAttribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = CallAttribute>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[CallAttribute; N]> for AttributeSet {
    fn from(attrs: [CallAttribute; N]) -> Self {
        attrs.into_iter().collect()
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(CallAttribute::as_str).collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Attributes results can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingAttribute {
    GeneId,
    ConditionId,
    AnatEntityId,
    StageId,
    MeanRank,
}

impl OrderingAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingAttribute::GeneId => "gene_id",
            OrderingAttribute::ConditionId => "condition_id",
            OrderingAttribute::AnatEntityId => "anat_entity_id",
            OrderingAttribute::StageId => "stage_id",
            OrderingAttribute::MeanRank => "mean_rank",
        }
    }

    /// Field that must be fetched to order by this attribute
    pub fn required_field(&self) -> CallAttribute {
        match self {
            OrderingAttribute::GeneId => CallAttribute::GeneId,
            OrderingAttribute::ConditionId
            | OrderingAttribute::AnatEntityId
            | OrderingAttribute::StageId => CallAttribute::ConditionId,
            OrderingAttribute::MeanRank => CallAttribute::MeanRank,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallOrdering {
    pub attribute: OrderingAttribute,
    #[serde(default = "default_direction")]
    pub direction: SortDirection,
}

fn default_direction() -> SortDirection {
    SortDirection::Asc
}

impl CallOrdering {
    pub fn asc(attribute: OrderingAttribute) -> Self {
        Self {
            attribute,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(attribute: OrderingAttribute) -> Self {
        Self {
            attribute,
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for CallOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.attribute.as_str(), self.direction.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let attrs = AttributeSet::parse_list("gene_id, condition_id,mean_rank").unwrap();
        assert_eq!(
            attrs,
            AttributeSet::from([
                CallAttribute::GeneId,
                CallAttribute::ConditionId,
                CallAttribute::MeanRank
            ])
        );
    }

    #[test]
    fn test_parse_unknown_attribute() {
        let err = AttributeSet::parse_list("gene_id,expression_score").unwrap_err();
        assert_eq!(err.code().code(), "EXPR_UNRECOGNIZED_FIELD");
        assert_eq!(err.item(), Some("expression_score"));
    }

    #[test]
    fn test_anat_origin_needs_aggregation_only_with_substructures() {
        assert!(CallAttribute::AnatOriginOfLine.needs_aggregation(true));
        assert!(!CallAttribute::AnatOriginOfLine.needs_aggregation(false));
        assert!(CallAttribute::StageOriginOfLine.needs_aggregation(false));
        assert!(!CallAttribute::GeneId.needs_aggregation(true));
    }

    #[test]
    fn test_every_name_parses_back() {
        for attr in CallAttribute::ALL {
            assert_eq!(attr.as_str().parse::<CallAttribute>().unwrap(), attr);
        }
    }

    #[test]
    fn test_ordering_fields() {
        assert_eq!(
            OrderingAttribute::StageId.required_field(),
            CallAttribute::ConditionId
        );
        assert_eq!(
            OrderingAttribute::MeanRank.required_field(),
            CallAttribute::MeanRank
        );
    }
}

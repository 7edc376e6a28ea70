//! Data types and per-data-type evidence
//!
//! Every raw call row carries evidence for one or more data types. Evidence
//! is the pair (quality, optional rank); aggregation keeps the best of each.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::planner::PlannerError;

/// Experimental data types producing expression evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Affymetrix microarrays
    Affymetrix,
    /// Expressed sequence tags
    Est,
    /// In situ hybridization
    InSitu,
    /// Bulk RNA-Seq
    RnaSeq,
    /// Full-length single-cell RNA-Seq
    FullLengthRnaSeq,
}

impl DataType {
    /// All data types, in declaration order
    pub const ALL: [DataType; 5] = [
        DataType::Affymetrix,
        DataType::Est,
        DataType::InSitu,
        DataType::RnaSeq,
        DataType::FullLengthRnaSeq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Affymetrix => "affymetrix",
            DataType::Est => "est",
            DataType::InSitu => "in_situ",
            DataType::RnaSeq => "rna_seq",
            DataType::FullLengthRnaSeq => "full_length_rna_seq",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| PlannerError::invalid_request(format!("Unknown data type '{}'", s)))
    }
}

/// Quality of the evidence a data type provides for a call.
///
/// Ordered: `Low < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Low,
    High,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Low => "low",
            DataQuality::High => "high",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence one data type provides for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Evidence quality
    pub quality: DataQuality,
    /// Expression rank (lower means higher expression)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
}

impl Evidence {
    pub fn new(quality: DataQuality) -> Self {
        Self {
            quality,
            rank: None,
        }
    }

    pub fn with_rank(mut self, rank: f64) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Best of two pieces of evidence: highest quality, lowest rank.
    pub fn best_of(self, other: Evidence) -> Evidence {
        let rank = match (self.rank, other.rank) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Evidence {
            quality: self.quality.max(other.quality),
            rank,
        }
    }
}

//! Call records
//!
//! `CallRow` is what the storage collaborator hands back for one physical
//! execution; `Call` is what the cursor yields to the caller, holding only
//! the requested attributes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::condition::{ConditionId, ConditionParams, GeneId};
use super::data_type::{DataQuality, DataType, Evidence};
use super::origin::OriginOfLine;

/// Composite identity of an aggregated call.
///
/// Ordered by dimension: gene, anatomical entity, stage. The structural
/// tuple makes distinct calls distinct regardless of the characters used
/// in entity ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SyntheticCallId {
    pub gene_id: GeneId,
    pub anat_entity_id: Option<String>,
    pub stage_id: Option<String>,
}

impl SyntheticCallId {
    pub fn new(
        gene_id: GeneId,
        anat_entity_id: Option<impl Into<String>>,
        stage_id: Option<impl Into<String>>,
    ) -> Self {
        Self {
            gene_id,
            anat_entity_id: anat_entity_id.map(Into::into),
            stage_id: stage_id.map(Into::into),
        }
    }

    /// Synthesizes the identity of the call of `gene_id` in `params`
    pub fn synthesize(gene_id: GeneId, params: &ConditionParams) -> Self {
        Self {
            gene_id,
            anat_entity_id: params.anat_entity_id.clone(),
            stage_id: params.stage_id.clone(),
        }
    }
}

/// Renders as a JSON array `[gene, anat, stage]`, `null` for a missing
/// dimension.
impl fmt::Display for SyntheticCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let anat = serde_json::Value::from(self.anat_entity_id.as_deref());
        let stage = serde_json::Value::from(self.stage_id.as_deref());
        write!(f, "[{},{},{}]", self.gene_id, anat, stage)
    }
}

/// Identity of a call
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallIdentity {
    /// Identifier of the physical row
    Physical(u64),
    /// Composite identity of a call merged from several rows
    Synthesized(SyntheticCallId),
}

impl fmt::Display for CallIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallIdentity::Physical(id) => write!(f, "{}", id),
            CallIdentity::Synthesized(id) => write!(f, "{}", id),
        }
    }
}

/// A row returned by one physical execution.
///
/// Fields mirror `Call`; fields the plan did not fetch are `None`. The
/// observed flag is not carried: it is derived from the two origins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRow {
    /// Physical identifier, absent when rows were merged
    pub physical_id: Option<u64>,
    pub gene_id: Option<GeneId>,
    pub condition_id: Option<ConditionId>,
    /// Parameters of the row's condition, fetched with the condition id
    pub condition: Option<ConditionParams>,
    pub qualities: Option<BTreeMap<DataType, DataQuality>>,
    pub ranks: Option<BTreeMap<DataType, f64>>,
    pub anat_origin: Option<OriginOfLine>,
    pub stage_origin: Option<OriginOfLine>,
    pub mean_rank: Option<f64>,
}

impl CallRow {
    /// Hashable image of the row, for DISTINCT over a projection
    pub fn signature(&self) -> CallSignature {
        CallSignature::new(
            self.physical_id.map(CallIdentity::Physical),
            self.gene_id,
            self.condition_id,
            self.qualities.as_ref(),
            self.ranks.as_ref(),
            (self.anat_origin, self.stage_origin, None),
            self.mean_rank,
        )
    }
}

/// Splits per-data-type evidence into quality and rank maps
pub fn split_evidence(
    evidence: &BTreeMap<DataType, Evidence>,
) -> (BTreeMap<DataType, DataQuality>, BTreeMap<DataType, f64>) {
    let qualities = evidence.iter().map(|(dt, e)| (*dt, e.quality)).collect();
    let ranks = evidence
        .iter()
        .filter_map(|(dt, e)| e.rank.map(|r| (*dt, r)))
        .collect();
    (qualities, ranks)
}

/// A call yielded to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Call {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CallIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gene_id: Option<GeneId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<ConditionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type_qualities: Option<BTreeMap<DataType, DataQuality>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type_ranks: Option<BTreeMap<DataType, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anat_origin_of_line: Option<OriginOfLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_origin_of_line: Option<OriginOfLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_rank: Option<f64>,
}

/// Hashable image of a call, used to suppress duplicates across batches.
///
/// Ranks are compared by their bit patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    id: Option<CallIdentity>,
    gene_id: Option<GeneId>,
    condition_id: Option<ConditionId>,
    qualities: Option<Vec<(DataType, DataQuality)>>,
    ranks: Option<Vec<(DataType, u64)>>,
    anat_origin: Option<OriginOfLine>,
    stage_origin: Option<OriginOfLine>,
    observed: Option<bool>,
    mean_rank: Option<u64>,
}

impl CallSignature {
    fn new(
        id: Option<CallIdentity>,
        gene_id: Option<GeneId>,
        condition_id: Option<ConditionId>,
        qualities: Option<&BTreeMap<DataType, DataQuality>>,
        ranks: Option<&BTreeMap<DataType, f64>>,
        (anat_origin, stage_origin, observed): (
            Option<OriginOfLine>,
            Option<OriginOfLine>,
            Option<bool>,
        ),
        mean_rank: Option<f64>,
    ) -> Self {
        Self {
            id,
            gene_id,
            condition_id,
            qualities: qualities.map(|m| m.iter().map(|(dt, q)| (*dt, *q)).collect()),
            ranks: ranks.map(|m| m.iter().map(|(dt, r)| (*dt, r.to_bits())).collect()),
            anat_origin,
            stage_origin,
            observed,
            mean_rank: mean_rank.map(f64::to_bits),
        }
    }
}

impl Call {
    pub fn signature(&self) -> CallSignature {
        CallSignature::new(
            self.id.clone(),
            self.gene_id,
            self.condition_id,
            self.data_type_qualities.as_ref(),
            self.data_type_ranks.as_ref(),
            (
                self.anat_origin_of_line,
                self.stage_origin_of_line,
                self.observed_data,
            ),
            self.mean_rank,
        )
    }
}

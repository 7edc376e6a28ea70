//! On-the-fly aggregation
//!
//! Rows collapsing into the same (gene, condition) after propagation are
//! merged into one call: best evidence per data type, merged origins. A
//! merged call has no physical identifier.

use std::collections::BTreeMap;

use crate::filter::Candidate;
use crate::model::{
    split_evidence, AttributeSet, CallAttribute, CallRow, ConditionId, ConditionParams, DataType,
    Evidence, GeneId, OriginOfLine,
};

/// A row in flight: a physical row, possibly propagated to an ancestor
/// condition, or a merged call
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCall {
    pub physical_id: Option<u64>,
    pub gene_id: GeneId,
    /// Condition the row is attributed to (the ancestor, when propagated)
    pub condition_id: ConditionId,
    pub params: ConditionParams,
    pub evidence: BTreeMap<DataType, Evidence>,
    pub anat_origin: OriginOfLine,
    pub stage_origin: OriginOfLine,
}

impl CandidateCall {
    /// View used by predicate evaluation
    pub fn view(&self) -> Candidate<'_> {
        Candidate {
            gene_id: self.gene_id,
            condition_id: self.condition_id,
            params: &self.params,
            evidence: &self.evidence,
            anat_origin: self.anat_origin,
            stage_origin: self.stage_origin,
        }
    }

    /// Mean of the per-data-type ranks; `None` without any rank
    pub fn mean_rank(&self) -> Option<f64> {
        let ranks: Vec<f64> = self.evidence.values().filter_map(|e| e.rank).collect();
        if ranks.is_empty() {
            return None;
        }
        Some(ranks.iter().sum::<f64>() / ranks.len() as f64)
    }

    /// Merges another row of the same (gene, condition)
    fn absorb(&mut self, other: CandidateCall) {
        for (data_type, evidence) in other.evidence {
            self.evidence
                .entry(data_type)
                .and_modify(|e| *e = e.best_of(evidence))
                .or_insert(evidence);
        }
        self.anat_origin = self.anat_origin.merge(other.anat_origin);
        self.stage_origin = self.stage_origin.merge(other.stage_origin);
        self.physical_id = None;
    }

    /// Keeps only the fetched attributes
    pub fn project(&self, fetched: &AttributeSet) -> CallRow {
        let (qualities, ranks) = split_evidence(&self.evidence);
        let wants = |attr| fetched.contains(attr);

        CallRow {
            physical_id: if wants(CallAttribute::Id) {
                self.physical_id
            } else {
                None
            },
            gene_id: wants(CallAttribute::GeneId).then_some(self.gene_id),
            condition_id: wants(CallAttribute::ConditionId).then_some(self.condition_id),
            condition: wants(CallAttribute::ConditionId).then(|| self.params.clone()),
            qualities: wants(CallAttribute::DataTypeQuality).then_some(qualities),
            ranks: wants(CallAttribute::DataTypeRank).then_some(ranks),
            anat_origin: wants(CallAttribute::AnatOriginOfLine).then_some(self.anat_origin),
            stage_origin: wants(CallAttribute::StageOriginOfLine).then_some(self.stage_origin),
            mean_rank: if wants(CallAttribute::MeanRank) {
                self.mean_rank()
            } else {
                None
            },
        }
    }
}

/// Groups rows by (gene, condition) and merges each group
#[derive(Debug, Default)]
pub struct CallAggregator {
    calls: BTreeMap<(GeneId, ConditionId), CandidateCall>,
}

impl CallAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, row: CandidateCall) {
        let key = (row.gene_id, row.condition_id);
        match self.calls.get_mut(&key) {
            Some(call) => call.absorb(row),
            None => {
                let mut row = row;
                row.physical_id = None;
                self.calls.insert(key, row);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Merged calls in (gene, condition) order
    pub fn finish(self) -> Vec<CandidateCall> {
        self.calls.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataQuality;

    fn row(
        id: u64,
        condition_id: ConditionId,
        evidence: &[(DataType, DataQuality, Option<f64>)],
        stage_origin: OriginOfLine,
    ) -> CandidateCall {
        CandidateCall {
            physical_id: Some(id),
            gene_id: 10,
            condition_id,
            params: ConditionParams::new(9606).with_anat_entity("A1").with_stage("S2"),
            evidence: evidence
                .iter()
                .map(|(dt, q, r)| {
                    let e = Evidence::new(*q);
                    (*dt, r.map_or(e, |r| e.with_rank(r)))
                })
                .collect(),
            anat_origin: OriginOfLine::Own,
            stage_origin,
        }
    }

    #[test]
    fn test_merge_keeps_best_evidence_and_merges_origins() {
        let mut aggregator = CallAggregator::new();
        aggregator.add(row(
            1,
            5,
            &[(DataType::RnaSeq, DataQuality::Low, Some(20.0))],
            OriginOfLine::Own,
        ));
        aggregator.add(row(
            2,
            5,
            &[
                (DataType::RnaSeq, DataQuality::High, Some(30.0)),
                (DataType::Affymetrix, DataQuality::Low, Some(10.0)),
            ],
            OriginOfLine::Descendant,
        ));

        let calls = aggregator.finish();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.physical_id, None);
        assert_eq!(call.stage_origin, OriginOfLine::Both);
        assert_eq!(call.anat_origin, OriginOfLine::Own);

        let rna = call.evidence[&DataType::RnaSeq];
        assert_eq!(rna.quality, DataQuality::High);
        assert_eq!(rna.rank, Some(20.0));
        assert_eq!(call.mean_rank(), Some(15.0));
    }

    #[test]
    fn test_single_row_group_loses_physical_id() {
        let mut aggregator = CallAggregator::new();
        aggregator.add(row(1, 5, &[], OriginOfLine::Own));
        aggregator.add(row(2, 6, &[], OriginOfLine::Own));
        let calls = aggregator.finish();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.physical_id.is_none()));
    }

    #[test]
    fn test_project_fetched_only() {
        let call = row(
            1,
            5,
            &[(DataType::Est, DataQuality::High, None)],
            OriginOfLine::Own,
        );
        let projected = call.project(&AttributeSet::from([
            CallAttribute::GeneId,
            CallAttribute::DataTypeQuality,
        ]));

        assert_eq!(projected.gene_id, Some(10));
        assert_eq!(projected.condition_id, None);
        assert_eq!(projected.physical_id, None);
        assert_eq!(
            projected.qualities,
            Some(BTreeMap::from([(DataType::Est, DataQuality::High)]))
        );
        assert_eq!(projected.ranks, None);
        assert_eq!(projected.mean_rank, None);
    }

    #[test]
    fn test_mean_rank_without_ranks() {
        let call = row(1, 5, &[(DataType::Est, DataQuality::High, None)], OriginOfLine::Own);
        assert_eq!(call.mean_rank(), None);
    }
}

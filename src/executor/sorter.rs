//! Result ordering for one physical execution
//!
//! Sorts rows by the requested ordering keys, deterministically. Rows
//! missing a key sort first.

use std::cmp::Ordering;

use crate::model::{CallOrdering, CallRow, OrderingAttribute, SortDirection};

/// Sorts call rows
pub struct CallSorter;

impl CallSorter {
    /// Sorts rows according to the ordering keys, in key order.
    ///
    /// Sort is stable: ties keep their store order.
    pub fn sort(rows: &mut [CallRow], ordering: &[CallOrdering]) {
        if ordering.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            ordering
                .iter()
                .map(|key| {
                    let ordering = Self::compare_key(a, b, key.attribute);
                    match key.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    fn compare_key(a: &CallRow, b: &CallRow, attribute: OrderingAttribute) -> Ordering {
        match attribute {
            OrderingAttribute::GeneId => a.gene_id.cmp(&b.gene_id),
            OrderingAttribute::ConditionId => a.condition_id.cmp(&b.condition_id),
            OrderingAttribute::AnatEntityId => {
                let id = |row: &CallRow| {
                    row.condition
                        .as_ref()
                        .and_then(|c| c.anat_entity_id.clone())
                };
                id(a).cmp(&id(b))
            }
            OrderingAttribute::StageId => {
                let id = |row: &CallRow| row.condition.as_ref().and_then(|c| c.stage_id.clone());
                id(a).cmp(&id(b))
            }
            OrderingAttribute::MeanRank => match (a.mean_rank, b.mean_rank) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.total_cmp(&y),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConditionParams;

    fn row(gene: u32, anat: &str, mean_rank: Option<f64>) -> CallRow {
        CallRow {
            gene_id: Some(gene),
            condition: Some(ConditionParams::new(9606).with_anat_entity(anat)),
            mean_rank,
            ..CallRow::default()
        }
    }

    fn genes(rows: &[CallRow]) -> Vec<u32> {
        rows.iter().filter_map(|r| r.gene_id).collect()
    }

    #[test]
    fn test_sort_ascending() {
        let mut rows = vec![row(3, "A", None), row(1, "A", None), row(2, "A", None)];
        CallSorter::sort(&mut rows, &[CallOrdering::asc(OrderingAttribute::GeneId)]);
        assert_eq!(genes(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_descending() {
        let mut rows = vec![row(3, "A", None), row(1, "A", None), row(2, "A", None)];
        CallSorter::sort(&mut rows, &[CallOrdering::desc(OrderingAttribute::GeneId)]);
        assert_eq!(genes(&rows), vec![3, 2, 1]);
    }

    #[test]
    fn test_second_key_breaks_ties() {
        let mut rows = vec![row(1, "B", None), row(2, "A", None), row(1, "A", None)];
        CallSorter::sort(
            &mut rows,
            &[
                CallOrdering::asc(OrderingAttribute::GeneId),
                CallOrdering::asc(OrderingAttribute::AnatEntityId),
            ],
        );
        let anat: Vec<_> = rows
            .iter()
            .map(|r| (r.gene_id, r.condition.as_ref().and_then(|c| c.anat_entity_id.clone())))
            .collect();
        assert_eq!(
            anat,
            vec![
                (Some(1), Some("A".to_string())),
                (Some(1), Some("B".to_string())),
                (Some(2), Some("A".to_string())),
            ]
        );
    }

    #[test]
    fn test_sort_stable_and_missing_rank_first() {
        let mut rows = vec![
            row(1, "A", Some(2.0)),
            row(2, "A", None),
            row(3, "A", Some(1.0)),
            row(4, "A", Some(1.0)),
        ];
        CallSorter::sort(&mut rows, &[CallOrdering::asc(OrderingAttribute::MeanRank)]);
        assert_eq!(genes(&rows), vec![2, 3, 4, 1]);
    }

    #[test]
    fn test_empty_ordering_keeps_store_order() {
        let mut rows = vec![row(3, "A", None), row(1, "A", None)];
        CallSorter::sort(&mut rows, &[]);
        assert_eq!(genes(&rows), vec![3, 1]);
    }
}

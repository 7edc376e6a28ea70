//! In-memory reference store
//!
//! Holds a small dataset of conditions, raw calls and the two hierarchy
//! closures, and executes query plans against it. For every registered
//! combination it precomputes:
//!
//! - the condition table: dataset conditions collapsed to the combination's
//!   dimensions, plus every condition reachable by propagation
//! - the expression table: one row per (gene, condition), best evidence
//! - the global table: the expression table propagated up the anatomy,
//!   with per-data-type evidence split between the node and its descendants
//!
//! Stage propagation and aggregation happen at query time.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::aggregate::{CallAggregator, CandidateCall};
use super::closure::{HierarchyClosure, HierarchyEdge};
use super::errors::{ExecutorError, ExecutorResult};
use super::sorter::CallSorter;
use super::store::CallStore;
use crate::combination::{CombinationRegistry, ConditionDimensionCombination};
use crate::model::{
    CallRow, Condition, ConditionDimension, ConditionId, ConditionParams, DataType, Evidence,
    GeneId, OriginOfLine,
};
use crate::planner::{IdentitySource, QueryPlan};

/// A raw per-(gene, condition) assertion with per-data-type evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCall {
    pub id: u64,
    pub gene_id: GeneId,
    pub condition_id: ConditionId,
    pub evidence: BTreeMap<DataType, Evidence>,
}

/// Reference dataset, as loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dataset {
    pub conditions: Vec<Condition>,
    pub calls: Vec<RawCall>,
    /// Anatomical containment edges
    pub anatomy: Vec<HierarchyEdge>,
    /// Developmental stage containment edges
    pub stages: Vec<HierarchyEdge>,
}

impl Dataset {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Evidence of one data type, split by where it was seen
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Lineage {
    own: Option<Evidence>,
    descendant: Option<Evidence>,
}

impl Lineage {
    fn add(&mut self, evidence: Evidence, own: bool) {
        let slot = if own {
            &mut self.own
        } else {
            &mut self.descendant
        };
        *slot = Some(match *slot {
            Some(existing) => existing.best_of(evidence),
            None => evidence,
        });
    }

    fn best(&self) -> Option<Evidence> {
        match (self.own, self.descendant) {
            (Some(a), Some(b)) => Some(a.best_of(b)),
            (a, b) => a.or(b),
        }
    }
}

/// A stored row of the expression or global table
#[derive(Debug, Clone)]
struct StoredCall {
    id: u64,
    gene_id: GeneId,
    condition_id: ConditionId,
    evidence: BTreeMap<DataType, Lineage>,
}

/// Precomputed tables of one combination
#[derive(Debug, Clone, Default)]
struct CombinationTables {
    conditions: BTreeMap<ConditionId, ConditionParams>,
    index: BTreeMap<ConditionParams, ConditionId>,
    expression: Vec<StoredCall>,
    global: Vec<StoredCall>,
}

impl CombinationTables {
    fn params(&self, id: ConditionId) -> ExecutorResult<&ConditionParams> {
        self.conditions
            .get(&id)
            .ok_or(ExecutorError::UnknownCondition(id))
    }

    fn condition_id(&self, params: &ConditionParams) -> ExecutorResult<ConditionId> {
        self.index.get(params).copied().ok_or_else(|| {
            ExecutorError::Storage(format!("No stored condition for {:?}", params))
        })
    }
}

/// In-memory implementation of the storage collaborator
#[derive(Debug, Clone)]
pub struct MemoryCallStore {
    tables: BTreeMap<&'static str, CombinationTables>,
    stages: HierarchyClosure,
}

impl MemoryCallStore {
    /// Loads a dataset, precomputing the tables of every registered
    /// combination.
    ///
    /// A raw call or mapping referencing an unknown condition is rejected.
    pub fn build(dataset: &Dataset, registry: &CombinationRegistry) -> ExecutorResult<Self> {
        let anatomy = HierarchyClosure::from_edges(&dataset.anatomy);
        let stages = HierarchyClosure::from_edges(&dataset.stages);
        let conditions: BTreeMap<ConditionId, &Condition> =
            dataset.conditions.iter().map(|c| (c.id, c)).collect();

        let tables = registry
            .iter()
            .map(|combination| {
                let tables = build_tables(dataset, &conditions, combination, &anatomy, &stages)?;
                Ok((combination.name(), tables))
            })
            .collect::<ExecutorResult<_>>()?;

        Ok(Self { tables, stages })
    }

    /// Parameters of a stored condition of a combination
    pub fn condition(&self, combination: &str, id: ConditionId) -> Option<&ConditionParams> {
        self.tables.get(combination)?.conditions.get(&id)
    }

    /// Id of the stored condition with these parameters
    pub fn condition_id(&self, combination: &str, params: &ConditionParams) -> Option<ConditionId> {
        self.tables.get(combination)?.index.get(params).copied()
    }

    fn tables_for(&self, plan: &QueryPlan) -> ExecutorResult<&CombinationTables> {
        let name = plan.combination.name();
        self.tables
            .get(name)
            .ok_or_else(|| ExecutorError::Storage(format!("No tables for combination '{}'", name)))
    }

    /// The row as seen by the plan: other data types dropped, anatomy
    /// origin derived. `None` when no considered evidence is left.
    fn candidate(
        &self,
        tables: &CombinationTables,
        stored: &StoredCall,
        plan: &QueryPlan,
    ) -> ExecutorResult<Option<CandidateCall>> {
        let considered: Vec<(&DataType, &Lineage)> = stored
            .evidence
            .iter()
            .filter(|(dt, _)| plan.considers(**dt))
            .collect();

        let at_node = considered.iter().any(|(_, l)| l.own.is_some());
        let at_descendant = considered.iter().any(|(_, l)| l.descendant.is_some());
        let Some(anat_origin) = OriginOfLine::derive(at_node, at_descendant, plan.sub_anat) else {
            return Ok(None);
        };

        Ok(Some(CandidateCall {
            physical_id: Some(stored.id),
            gene_id: stored.gene_id,
            condition_id: stored.condition_id,
            params: tables.params(stored.condition_id)?.clone(),
            evidence: considered
                .into_iter()
                .filter_map(|(dt, l)| l.best().map(|e| (*dt, e)))
                .collect(),
            anat_origin,
            stage_origin: OriginOfLine::Own,
        }))
    }

    /// The row attributed to its stage and to every ancestor stage
    fn propagate_stage(
        &self,
        tables: &CombinationTables,
        row: CandidateCall,
        plan: &QueryPlan,
    ) -> ExecutorResult<Vec<CandidateCall>> {
        let stage = match &row.params.stage_id {
            Some(stage) if plan.sub_stage => stage.clone(),
            _ => return Ok(vec![row]),
        };

        self.stages
            .ancestors_or_self(&stage)
            .map(|target| {
                let params = row.params.clone().with_stage(target);
                Ok(CandidateCall {
                    condition_id: tables.condition_id(&params)?,
                    params,
                    stage_origin: if target == stage {
                        OriginOfLine::Own
                    } else {
                        OriginOfLine::Descendant
                    },
                    ..row.clone()
                })
            })
            .collect()
    }
}

/// Rows of one execution
#[derive(Debug)]
pub struct MemoryRows {
    rows: std::vec::IntoIter<CallRow>,
}

impl Iterator for MemoryRows {
    type Item = ExecutorResult<CallRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }
}

impl CallStore for MemoryCallStore {
    type Rows = MemoryRows;

    fn candidate_genes(
        &self,
        plan: &QueryPlan,
        offset: usize,
        limit: usize,
    ) -> ExecutorResult<Vec<GeneId>> {
        let tables = self.tables_for(plan)?;
        let table = if plan.sub_anat {
            &tables.global
        } else {
            &tables.expression
        };

        let mut genes = BTreeSet::new();
        for stored in table {
            if genes.contains(&stored.gene_id)
                || !stored.evidence.keys().any(|dt| plan.considers(*dt))
            {
                continue;
            }
            let species = tables.params(stored.condition_id)?.species_id;
            if plan.filters.admits_gene(stored.gene_id, species) {
                genes.insert(stored.gene_id);
            }
        }
        Ok(genes.into_iter().skip(offset).take(limit).collect())
    }

    fn execute(&self, plan: &QueryPlan, genes: Option<&[GeneId]>) -> ExecutorResult<MemoryRows> {
        let tables = self.tables_for(plan)?;
        let table = if plan.sub_anat {
            &tables.global
        } else {
            &tables.expression
        };
        let slice: Option<BTreeSet<GeneId>> = genes.map(|g| g.iter().copied().collect());
        let matcher = plan.matcher();

        let mut candidates = Vec::new();
        for stored in table {
            if slice.as_ref().is_some_and(|s| !s.contains(&stored.gene_id)) {
                continue;
            }
            let Some(row) = self.candidate(tables, stored, plan)? else {
                continue;
            };
            for propagated in self.propagate_stage(tables, row, plan)? {
                if matcher.matches_row(&propagated.view()) {
                    candidates.push(propagated);
                }
            }
        }

        if plan.need_aggregation {
            let mut aggregator = CallAggregator::new();
            for row in candidates {
                aggregator.add(row);
            }
            candidates = aggregator.finish();
            if plan.need_post_aggregation_filter {
                candidates.retain(|call| matcher.matches_call(&call.view()));
            }
        }

        // DISTINCT over the fetched projection
        let mut seen = HashSet::new();
        let mut rows: Vec<CallRow> = candidates
            .iter()
            .map(|call| {
                let mut row = call.project(&plan.fetched);
                if plan.identity == IdentitySource::Synthesized {
                    row.physical_id = None;
                }
                row
            })
            .filter(|row| seen.insert(row.signature()))
            .collect();
        CallSorter::sort(&mut rows, &plan.ordering);

        Ok(MemoryRows {
            rows: rows.into_iter(),
        })
    }
}

fn build_tables(
    dataset: &Dataset,
    conditions: &BTreeMap<ConditionId, &Condition>,
    combination: &ConditionDimensionCombination,
    anatomy: &HierarchyClosure,
    stages: &HierarchyClosure,
) -> ExecutorResult<CombinationTables> {
    let dims = combination.dimensions();
    let lookup = |id: ConditionId| {
        conditions
            .get(&id)
            .copied()
            .ok_or(ExecutorError::UnknownCondition(id))
    };

    // Raw calls collapsed to the combination's granularity
    let mut expression: BTreeMap<(GeneId, ConditionParams), BTreeMap<DataType, Evidence>> =
        BTreeMap::new();
    for call in &dataset.calls {
        let mapped = lookup(lookup(call.condition_id)?.mapped_condition_id())?;
        let merged = expression
            .entry((call.gene_id, mapped.params.project(dims)))
            .or_default();
        for (data_type, evidence) in &call.evidence {
            merged
                .entry(*data_type)
                .and_modify(|e| *e = e.best_of(*evidence))
                .or_insert(*evidence);
        }
    }

    // Anatomy propagation
    let mut global: BTreeMap<(GeneId, ConditionParams), BTreeMap<DataType, Lineage>> =
        BTreeMap::new();
    for ((gene_id, params), evidence) in &expression {
        let targets: Vec<Option<&str>> = match params.anat_entity_id.as_deref() {
            Some(anat) => anatomy.ancestors_or_self(anat).map(Some).collect(),
            None => vec![None],
        };
        for target in targets {
            let own = target == params.anat_entity_id.as_deref();
            let target_params = params
                .clone()
                .with_value(ConditionDimension::Anatomy, target.map(str::to_string));
            let lineage = global.entry((*gene_id, target_params)).or_default();
            for (data_type, e) in evidence {
                lineage.entry(*data_type).or_default().add(*e, own);
            }
        }
    }

    // Every condition a call can be attributed to, stage ancestors included
    let mut universe: BTreeSet<ConditionParams> = BTreeSet::new();
    for (_, params) in global.keys() {
        match params.stage_id.as_deref() {
            Some(stage) if combination.covers(ConditionDimension::Stage) => {
                for target in stages.ancestors_or_self(stage) {
                    universe.insert(params.clone().with_stage(target));
                }
            }
            _ => {
                universe.insert(params.clone());
            }
        }
    }

    // Dataset ids are kept for conditions already at this granularity
    let mut index: BTreeMap<ConditionParams, ConditionId> = BTreeMap::new();
    for condition in conditions.values() {
        if universe.contains(&condition.params) {
            index.entry(condition.params.clone()).or_insert(condition.id);
        }
    }
    let mut next_id = conditions.keys().next_back().map_or(1, |max| max + 1);
    for params in &universe {
        if !index.contains_key(params) {
            index.insert(params.clone(), next_id);
            next_id += 1;
        }
    }

    let id_of = |params: &ConditionParams| {
        index
            .get(params)
            .copied()
            .ok_or_else(|| ExecutorError::Storage(format!("Unindexed condition {:?}", params)))
    };
    let expression = number_rows(
        expression
            .into_iter()
            .map(|((gene_id, params), evidence)| {
                let lineage: BTreeMap<DataType, Lineage> = evidence
                    .into_iter()
                    .map(|(dt, e)| {
                        (
                            dt,
                            Lineage {
                                own: Some(e),
                                descendant: None,
                            },
                        )
                    })
                    .collect();
                Ok(((gene_id, id_of(&params)?), lineage))
            })
            .collect::<ExecutorResult<_>>()?,
    );
    let global = number_rows(
        global
            .into_iter()
            .map(|((gene_id, params), lineage)| Ok(((gene_id, id_of(&params)?), lineage)))
            .collect::<ExecutorResult<_>>()?,
    );

    Ok(CombinationTables {
        conditions: index.iter().map(|(p, id)| (*id, p.clone())).collect(),
        index,
        expression,
        global,
    })
}

/// Assigns physical ids in (gene, condition) order
fn number_rows(rows: BTreeMap<(GeneId, ConditionId), BTreeMap<DataType, Lineage>>) -> Vec<StoredCall> {
    rows.into_iter()
        .zip(1u64..)
        .map(|(((gene_id, condition_id), evidence), id)| StoredCall {
            id,
            gene_id,
            condition_id,
            evidence,
        })
        .collect()
}

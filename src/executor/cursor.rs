//! Result cursor
//!
//! Lazy, pull-based sequence of calls over a query plan. Batched plans run
//! sequentially: the next batch is issued only once the current one is
//! exhausted, so at most one physical execution is open at a time.
//!
//! The cursor derives the observed flag, synthesizes identities of merged
//! calls, suppresses calls already emitted by an earlier batch when the
//! plan asks for it, and trims every call to the requested attributes.

use std::collections::HashSet;

use serde::Serialize;

use super::errors::{ExecutorError, ExecutorResult};
use super::store::CallStore;
use crate::model::{
    observed, AttributeSet, Call, CallAttribute, CallIdentity, CallRow, CallSignature, GeneId,
    SyntheticCallId,
};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::planner::{BatchingDecision, GeneSource, IdentitySource, QueryPlan};

/// Counters of one cursor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CursorStats {
    pub batches: u64,
    pub rows_read: u64,
    pub calls_emitted: u64,
    pub duplicates_suppressed: u64,
}

enum CursorState<R> {
    /// Between batches
    Pending,
    Open {
        rows: R,
        scope: ObservationScope,
        rows_read: u64,
        last: bool,
    },
    Exhausted,
    /// Closed by the caller; the next pull reports it once
    Closed,
    /// Fused after an error or a reported close
    Done,
}

/// Pull-based cursor over the calls of a plan
pub struct ResultCursor<'a, S: CallStore> {
    store: &'a S,
    plan: &'a QueryPlan,
    metrics: Option<&'a MetricsRegistry>,
    state: CursorState<S::Rows>,
    offset: usize,
    seen: HashSet<CallSignature>,
    stats: CursorStats,
}

impl<'a, S: CallStore> ResultCursor<'a, S> {
    /// Opens a cursor; no physical execution is issued before the first
    /// pull
    pub fn new(store: &'a S, plan: &'a QueryPlan) -> Self {
        let batching = match &plan.batching {
            BatchingDecision::SinglePass => "single_pass".to_string(),
            BatchingDecision::Batched { batch_size, .. } => format!("batched:{}", batch_size),
        };
        log_event_with_fields(
            Event::CursorOpened,
            &[
                ("combination", plan.combination.name()),
                ("batching", &batching),
            ],
        );

        Self {
            store,
            plan,
            metrics: None,
            state: CursorState::Pending,
            offset: 0,
            seen: HashSet::new(),
            stats: CursorStats::default(),
        }
    }

    /// Reports counters to a registry as well
    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn stats(&self) -> CursorStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed | CursorState::Done)
    }

    /// Releases the cursor. Only the current batch is open; it is dropped
    /// here and no further batch is issued.
    pub fn close(&mut self) {
        if matches!(self.state, CursorState::Closed | CursorState::Done) {
            return;
        }
        if let CursorState::Open { scope, rows_read, .. } =
            std::mem::replace(&mut self.state, CursorState::Closed)
        {
            scope.complete_with_fields(&[
                ("rows", &rows_read.to_string()),
                ("closed", "true"),
            ]);
        }
        self.state = CursorState::Closed;
        log_event_with_fields(
            Event::CursorClosed,
            &[("calls", &self.stats.calls_emitted.to_string())],
        );
    }

    /// Genes of the next batch; `None` once every batch ran
    fn next_batch(&self) -> ExecutorResult<Option<(Option<Vec<GeneId>>, bool)>> {
        match &self.plan.batching {
            BatchingDecision::SinglePass => {
                Ok((self.stats.batches == 0).then_some((None, true)))
            }
            BatchingDecision::Batched {
                batch_size,
                source: GeneSource::Restricted(genes),
                ..
            } => {
                if self.offset >= genes.len() {
                    return Ok(None);
                }
                let end = (self.offset + batch_size).min(genes.len());
                Ok(Some((
                    Some(genes[self.offset..end].to_vec()),
                    end == genes.len(),
                )))
            }
            BatchingDecision::Batched {
                batch_size,
                source: GeneSource::Store,
                ..
            } => {
                let genes = self
                    .store
                    .candidate_genes(self.plan, self.offset, *batch_size)?;
                if genes.is_empty() {
                    return Ok(None);
                }
                let last = genes.len() < *batch_size;
                Ok(Some((Some(genes), last)))
            }
        }
    }

    /// Issues the next physical execution. Returns false when there is none.
    fn open_batch(&mut self) -> ExecutorResult<bool> {
        let Some((genes, last)) = self.next_batch()? else {
            return Ok(false);
        };

        let offset = self.offset.to_string();
        let size = genes
            .as_ref()
            .map_or_else(|| "all".to_string(), |g| g.len().to_string());
        let scope = ObservationScope::with_fields("BATCH", &[("offset", &offset), ("genes", &size)]);

        let rows = match self.store.execute(self.plan, genes.as_deref()) {
            Ok(rows) => rows,
            Err(err) => {
                scope.fail(&err.to_string());
                return Err(err);
            }
        };

        self.offset += genes.as_ref().map_or(0, Vec::len);
        self.stats.batches += 1;
        if let Some(metrics) = self.metrics {
            metrics.increment_batches_executed();
        }
        self.state = CursorState::Open {
            rows,
            scope,
            rows_read: 0,
            last,
        };
        Ok(true)
    }

    fn finish(&mut self) {
        self.state = CursorState::Exhausted;
        if self.stats.duplicates_suppressed > 0 {
            log_event_with_fields(
                Event::DuplicatesSuppressed,
                &[("count", &self.stats.duplicates_suppressed.to_string())],
            );
        }
        log_event_with_fields(
            Event::CursorExhausted,
            &[
                ("batches", &self.stats.batches.to_string()),
                ("calls", &self.stats.calls_emitted.to_string()),
            ],
        );
    }

    fn fail(&mut self, err: ExecutorError) -> Option<ExecutorResult<Call>> {
        if let CursorState::Open { scope, .. } =
            std::mem::replace(&mut self.state, CursorState::Done)
        {
            scope.fail(&err.to_string());
        }
        log_event_with_fields(
            Event::ExecutionFailed,
            &[("code", err.code()), ("reason", &err.to_string())],
        );
        Some(Err(err))
    }

    /// Handles one row; `None` when it duplicates an emitted call
    fn emit(&mut self, row: CallRow) -> ExecutorResult<Option<Call>> {
        let call = build_call(self.plan, row)?;
        if self.plan.batching.deduplicates() && !self.seen.insert(call.signature()) {
            self.stats.duplicates_suppressed += 1;
            if let Some(metrics) = self.metrics {
                metrics.increment_duplicates_suppressed();
            }
            return Ok(None);
        }
        self.stats.calls_emitted += 1;
        if let Some(metrics) = self.metrics {
            metrics.increment_calls_emitted();
        }
        Ok(Some(trim(call, &self.plan.requested)))
    }
}

impl<S: CallStore> Iterator for ResultCursor<'_, S> {
    type Item = ExecutorResult<Call>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                CursorState::Exhausted | CursorState::Done => return None,
                CursorState::Closed => {
                    self.state = CursorState::Done;
                    return Some(Err(ExecutorError::CursorClosed));
                }
                CursorState::Pending => match self.open_batch() {
                    Ok(true) => {}
                    Ok(false) => {
                        self.finish();
                        return None;
                    }
                    Err(err) => return self.fail(err),
                },
                CursorState::Open {
                    rows, rows_read, ..
                } => match rows.next() {
                    Some(Ok(row)) => {
                        *rows_read += 1;
                        self.stats.rows_read += 1;
                        match self.emit(row) {
                            Ok(Some(call)) => return Some(Ok(call)),
                            Ok(None) => {}
                            Err(err) => return self.fail(err),
                        }
                    }
                    Some(Err(err)) => return self.fail(err),
                    None => {
                        let CursorState::Open {
                            scope,
                            rows_read,
                            last,
                            ..
                        } = std::mem::replace(&mut self.state, CursorState::Pending)
                        else {
                            continue;
                        };
                        scope.complete_with_fields(&[("rows", &rows_read.to_string())]);
                        if let Some(metrics) = self.metrics {
                            metrics.add_rows_read(rows_read);
                        }
                        if last {
                            self.finish();
                            return None;
                        }
                    }
                },
            }
        }
    }
}

fn missing(field: &str) -> ExecutorError {
    ExecutorError::Storage(format!("Row is missing fetched field '{}'", field))
}

/// Builds the call carrying every fetched attribute
fn build_call(plan: &QueryPlan, row: CallRow) -> ExecutorResult<Call> {
    let id = if plan.fetches(CallAttribute::Id) {
        Some(match plan.identity {
            IdentitySource::Physical => {
                CallIdentity::Physical(row.physical_id.ok_or_else(|| missing("id"))?)
            }
            IdentitySource::Synthesized => {
                let gene_id = row.gene_id.ok_or_else(|| missing("gene_id"))?;
                let params = row.condition.as_ref().ok_or_else(|| missing("condition_id"))?;
                CallIdentity::Synthesized(SyntheticCallId::synthesize(gene_id, params))
            }
        })
    } else {
        None
    };

    let observed_data = if plan.fetches(CallAttribute::ObservedData) {
        let anat = row
            .anat_origin
            .ok_or_else(|| missing("anat_origin_of_line"))?;
        let stage = row
            .stage_origin
            .ok_or_else(|| missing("stage_origin_of_line"))?;
        Some(observed(anat, stage))
    } else {
        None
    };

    Ok(Call {
        id,
        gene_id: row.gene_id,
        condition_id: row.condition_id,
        data_type_qualities: row.qualities,
        data_type_ranks: row.ranks,
        anat_origin_of_line: row.anat_origin,
        stage_origin_of_line: row.stage_origin,
        observed_data,
        mean_rank: row.mean_rank,
    })
}

/// Drops the attributes fetched only for evaluation or ordering
fn trim(call: Call, requested: &AttributeSet) -> Call {
    let keep = |attr| requested.contains(attr);
    Call {
        id: call.id.filter(|_| keep(CallAttribute::Id)),
        gene_id: call.gene_id.filter(|_| keep(CallAttribute::GeneId)),
        condition_id: call.condition_id.filter(|_| keep(CallAttribute::ConditionId)),
        data_type_qualities: call
            .data_type_qualities
            .filter(|_| keep(CallAttribute::DataTypeQuality)),
        data_type_ranks: call
            .data_type_ranks
            .filter(|_| keep(CallAttribute::DataTypeRank)),
        anat_origin_of_line: call
            .anat_origin_of_line
            .filter(|_| keep(CallAttribute::AnatOriginOfLine)),
        stage_origin_of_line: call
            .stage_origin_of_line
            .filter(|_| keep(CallAttribute::StageOriginOfLine)),
        observed_data: call
            .observed_data
            .filter(|_| keep(CallAttribute::ObservedData)),
        mean_rank: call.mean_rank.filter(|_| keep(CallAttribute::MeanRank)),
    }
}

//! CLI command implementations
//!
//! Commands are thin: read the inputs, plan, execute, print. Planning
//! itself never logs; accepted and rejected plans are logged here.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::combination::CombinationRegistry;
use crate::config::PlannerConfig;
use crate::executor::{CursorStats, Dataset, MemoryCallStore, ResultCursor};
use crate::observability::{
    log_event_with_fields, Event, Logger, MetricsRegistry, MetricsSnapshot,
};
use crate::planner::{CallRequest, ExplainPlan, PlannerResult, PropagationPlanner, QueryPlan};

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{read_json_file, write_json_line, write_text};

/// Last line written by `query`
#[derive(Debug, Serialize)]
struct QuerySummary {
    summary: CursorStats,
    metrics: MetricsSnapshot,
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(cli.log_level.into());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(cli.command, &mut out)
}

/// Run the appropriate command based on CLI args
pub fn run_command<W: Write>(cmd: Command, out: &mut W) -> CliResult<()> {
    match cmd {
        Command::Explain { request, config } => explain(&request, config.as_deref(), out),
        Command::Query {
            request,
            dataset,
            config,
        } => query(&request, &dataset, config.as_deref(), out),
    }
}

/// Load the planner configuration, or the defaults without a path
fn load_config(path: Option<&Path>) -> CliResult<PlannerConfig> {
    let config = match path {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    let source = path.map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("source", &source),
            ("batch_size", &config.batch_size.to_string()),
            (
                "single_pass_gene_limit",
                &config.single_pass_gene_limit.to_string(),
            ),
        ],
    );
    Ok(config)
}

fn plan_request(
    registry: &CombinationRegistry,
    config: &PlannerConfig,
    request: CallRequest,
    metrics: &MetricsRegistry,
) -> PlannerResult<QueryPlan> {
    let result = request
        .into_query()
        .and_then(|query| PropagationPlanner::new(registry, config).plan(&query));

    match &result {
        Ok(plan) => {
            metrics.increment_plans_accepted();
            log_event_with_fields(
                Event::QueryPlanned,
                &[
                    ("combination", plan.combination.name()),
                    ("aggregation", &plan.need_aggregation.to_string()),
                    ("post_filter", &plan.need_post_aggregation_filter.to_string()),
                    ("batched", &plan.batching.is_batched().to_string()),
                ],
            );
        }
        Err(err) => {
            metrics.increment_plans_rejected();
            log_event_with_fields(
                Event::QueryRejected,
                &[("code", err.code().code()), ("reason", err.message())],
            );
        }
    }
    result
}

/// Plan a request and print the explain output
///
/// A rejected request is not a command failure: the rejection is the
/// explain output.
pub fn explain<W: Write>(request: &Path, config: Option<&Path>, out: &mut W) -> CliResult<()> {
    let config = load_config(config)?;
    let request: CallRequest = read_json_file(request)?;
    let registry = CombinationRegistry::reference();
    let metrics = MetricsRegistry::new();

    let explain = match plan_request(&registry, &config, request, &metrics) {
        Ok(plan) => ExplainPlan::from_plan(&plan),
        Err(err) => ExplainPlan::from_error(&err),
    };
    write_text(out, explain.to_string().trim_end())
}

/// Run a request against a reference dataset
///
/// Writes one JSON call per line, then a summary line.
pub fn query<W: Write>(
    request: &Path,
    dataset: &Path,
    config: Option<&Path>,
    out: &mut W,
) -> CliResult<()> {
    let config = load_config(config)?;
    let request: CallRequest = read_json_file(request)?;
    let registry = CombinationRegistry::reference();
    let metrics = MetricsRegistry::new();
    let plan = plan_request(&registry, &config, request, &metrics)?;

    let dataset: Dataset = read_json_file(dataset)?;
    let store = MemoryCallStore::build(&dataset, &registry)?;
    log_event_with_fields(
        Event::DatasetLoaded,
        &[
            ("conditions", &dataset.conditions.len().to_string()),
            ("calls", &dataset.calls.len().to_string()),
        ],
    );

    let mut cursor = ResultCursor::new(&store, &plan).with_metrics(&metrics);
    for call in cursor.by_ref() {
        write_json_line(out, &call?)?;
    }

    let summary = QuerySummary {
        summary: cursor.stats(),
        metrics: metrics.snapshot(),
    };
    write_json_line(out, &summary)?;
    out.flush()?;
    Ok(())
}

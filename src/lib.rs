//! exprcall - expression call retrieval with propagation planning
//!
//! Requests for gene expression calls are planned once, up front: the
//! planner decides whether evidence must be aggregated, where each
//! predicate runs, which attributes are fetched and whether execution is
//! split into gene batches. The executor then streams calls through a
//! cursor.

pub mod cli;
pub mod combination;
pub mod config;
pub mod executor;
pub mod filter;
pub mod model;
pub mod observability;
pub mod planner;

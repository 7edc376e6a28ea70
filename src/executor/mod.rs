//! Execution subsystem
//!
//! Consumes query plans and yields calls.
//!
//! # Execution Flow (strict order)
//!
//! 1. Pick the gene slice of the next batch (the whole filter when single pass)
//! 2. Run one physical execution through the storage collaborator
//! 3. Build calls from rows: identity, observed flag
//! 4. Suppress calls already emitted by an earlier batch, when required
//! 5. Trim each call to the requested attributes
//! 6. Move to the next batch only once the current one is exhausted
//!
//! `MemoryCallStore` is the reference collaborator: it honors predicate
//! placement, fetched attributes and ordering of the plan.

mod aggregate;
mod closure;
mod cursor;
mod errors;
mod memory;
mod sorter;
mod store;

pub use aggregate::{CallAggregator, CandidateCall};
pub use closure::{HierarchyClosure, HierarchyEdge};
pub use cursor::{CursorStats, ResultCursor};
pub use errors::{ExecutorError, ExecutorResult};
pub use memory::{Dataset, MemoryCallStore, MemoryRows, RawCall};
pub use sorter::CallSorter;
pub use store::CallStore;

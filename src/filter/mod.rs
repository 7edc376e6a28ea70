//! Call filters
//!
//! A `FilterSet` is a disjunction of `FilterGroup`s; each group is a
//! conjunction of predicates on genes, species, conditions, per-data-type
//! quality and propagation origins. Filter values are immutable once the
//! set is built.

mod group;
mod matcher;
mod set;

pub use group::{ConditionFilter, FilterGroup, OriginFilter};
pub use matcher::{Candidate, FilterMatcher};
pub use set::{FilterSet, PredicateKind, PredicateScope, PromotedPredicates};

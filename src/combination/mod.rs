//! Condition-parameter combinations
//!
//! A fixed registry mapping a requested set of condition dimensions to the
//! physical tables storing calls over exactly that set.

mod registry;

pub use registry::{
    Binding, CombinationRegistry, ConditionDimensionCombination, ANATOMY, ANATOMY_STAGE,
};

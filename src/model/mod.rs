//! Data model for expression calls
//!
//! Leaf value types shared by every subsystem: conditions and their
//! dimensions, data types and evidence, origin of line, requestable
//! attributes and the call records themselves.

mod attribute;
mod call;
mod condition;
mod data_type;
mod origin;

pub use attribute::{AttributeSet, CallAttribute, CallOrdering, OrderingAttribute, SortDirection};
pub use call::{split_evidence, Call, CallIdentity, CallRow, CallSignature, SyntheticCallId};
pub use condition::{
    dimensions, Condition, ConditionDimension, ConditionId, ConditionParams, GeneId, SpeciesId,
};
pub use data_type::{DataQuality, DataType, Evidence};
pub use origin::{observed, OriginOfLine};

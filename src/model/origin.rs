//! Origin of line and the observed-data flag
//!
//! For one propagation dimension, the origin of line says where the
//! evidence for a call was seen: at the node itself, only at strict
//! descendants, or both. It is derived, never stored redundantly.
//!
//! A call is observed only when neither dimension is purely inherited:
//! `observed = anat ∈ {Own, Both} AND stage ∈ {Own, Both}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the evidence of a call was seen along one hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginOfLine {
    /// Evidence observed at the node itself
    #[serde(rename = "self")]
    Own,
    /// Evidence observed only at strict descendants
    Descendant,
    /// Evidence observed at the node and at descendants
    Both,
}

impl OriginOfLine {
    pub const ALL: [OriginOfLine; 3] = [
        OriginOfLine::Own,
        OriginOfLine::Descendant,
        OriginOfLine::Both,
    ];

    /// Derives the origin from where evidence exists.
    ///
    /// When propagation is inactive for the dimension the origin is always
    /// `Own`. Returns `None` when there is no evidence at all.
    pub fn derive(at_node: bool, at_descendant: bool, propagated: bool) -> Option<Self> {
        if !propagated {
            return (at_node || at_descendant).then_some(OriginOfLine::Own);
        }
        match (at_node, at_descendant) {
            (true, false) => Some(OriginOfLine::Own),
            (false, true) => Some(OriginOfLine::Descendant),
            (true, true) => Some(OriginOfLine::Both),
            (false, false) => None,
        }
    }

    /// Origin of a call built from two groups of rows with these origins.
    pub fn merge(self, other: OriginOfLine) -> OriginOfLine {
        if self == other {
            self
        } else {
            OriginOfLine::Both
        }
    }

    /// True unless the evidence is purely inherited from descendants.
    pub fn is_direct(&self) -> bool {
        !matches!(self, OriginOfLine::Descendant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OriginOfLine::Own => "self",
            OriginOfLine::Descendant => "descendant",
            OriginOfLine::Both => "both",
        }
    }
}

impl fmt::Display for OriginOfLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed-data flag. Strict conjunction over both dimensions.
pub fn observed(anat: OriginOfLine, stage: OriginOfLine) -> bool {
    anat.is_direct() && stage.is_direct()
}

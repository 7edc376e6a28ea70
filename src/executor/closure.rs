//! Hierarchy closure
//!
//! Precomputed transitive containment over one hierarchy (anatomical
//! entities or developmental stages). Closures exclude the node itself and
//! tolerate cycles.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

/// A direct containment edge: `child` is part of `parent`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub child: String,
    pub parent: String,
}

impl HierarchyEdge {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }
}

/// Ancestor and descendant closures of a hierarchy
#[derive(Debug, Clone, Default)]
pub struct HierarchyClosure {
    /// node -> strict ancestors
    ancestors: BTreeMap<String, BTreeSet<String>>,
    /// node -> strict descendants
    descendants: BTreeMap<String, BTreeSet<String>>,
}

impl HierarchyClosure {
    /// Builds the closure from direct edges
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a HierarchyEdge>) -> Self {
        let mut parents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for edge in edges {
            parents
                .entry(edge.child.as_str())
                .or_default()
                .push(edge.parent.as_str());
            children
                .entry(edge.parent.as_str())
                .or_default()
                .push(edge.child.as_str());
        }

        Self {
            ancestors: close_over(&parents),
            descendants: close_over(&children),
        }
    }

    /// Strict ancestors of `node`
    pub fn ancestors(&self, node: &str) -> impl Iterator<Item = &str> + '_ {
        self.ancestors
            .get(node)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// `node` followed by its strict ancestors
    pub fn ancestors_or_self<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::once(node).chain(self.ancestors(node))
    }

    /// Strict descendants of `node`
    pub fn descendants(&self, node: &str) -> impl Iterator<Item = &str> + '_ {
        self.descendants
            .get(node)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// True when `descendant` is strictly contained in `ancestor`
    pub fn is_strict_descendant(&self, descendant: &str, ancestor: &str) -> bool {
        self.ancestors
            .get(descendant)
            .is_some_and(|a| a.contains(ancestor))
    }

    /// True when the hierarchy has no edge
    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }
}

fn close_over(direct: &BTreeMap<&str, Vec<&str>>) -> BTreeMap<String, BTreeSet<String>> {
    direct
        .keys()
        .map(|start| (start.to_string(), reachable(start, direct)))
        .collect()
}

/// Nodes reachable from `start` by BFS, excluding `start` even through a
/// cycle
fn reachable(start: &str, direct: &BTreeMap<&str, Vec<&str>>) -> BTreeSet<String> {
    let mut visited: BTreeSet<&str> = BTreeSet::from([start]);
    let mut queue: VecDeque<&str> = VecDeque::from([start]);
    let mut result = BTreeSet::new();

    while let Some(node) = queue.pop_front() {
        for &next in direct.get(node).into_iter().flatten() {
            if visited.insert(next) {
                result.insert(next.to_string());
                queue.push_back(next);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages() -> HierarchyClosure {
        // S3 ⊂ S2 ⊂ S1, S4 ⊂ S1
        let edges = [
            HierarchyEdge::new("S2", "S1"),
            HierarchyEdge::new("S3", "S2"),
            HierarchyEdge::new("S4", "S1"),
        ];
        HierarchyClosure::from_edges(&edges)
    }

    #[test]
    fn test_ancestors_are_transitive() {
        let closure = stages();
        let ancestors: Vec<_> = closure.ancestors("S3").collect();
        assert_eq!(ancestors, vec!["S1", "S2"]);
        let with_self: Vec<_> = closure.ancestors_or_self("S3").collect();
        assert_eq!(with_self, vec!["S3", "S1", "S2"]);
    }

    #[test]
    fn test_descendants() {
        let closure = stages();
        let descendants: Vec<_> = closure.descendants("S1").collect();
        assert_eq!(descendants, vec!["S2", "S3", "S4"]);
        assert_eq!(closure.descendants("S3").count(), 0);
    }

    #[test]
    fn test_strict_descendant() {
        let closure = stages();
        assert!(closure.is_strict_descendant("S3", "S1"));
        assert!(!closure.is_strict_descendant("S1", "S1"));
        assert!(!closure.is_strict_descendant("S4", "S2"));
    }

    #[test]
    fn test_unknown_node_is_its_own_root() {
        let closure = stages();
        let with_self: Vec<_> = closure.ancestors_or_self("X").collect();
        assert_eq!(with_self, vec!["X"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let edges = [HierarchyEdge::new("A", "B"), HierarchyEdge::new("B", "A")];
        let closure = HierarchyClosure::from_edges(&edges);
        assert_eq!(closure.ancestors("A").collect::<Vec<_>>(), vec!["B"]);
        assert!(!closure.is_empty());
    }
}

//! Role graph arena with cycle-checked, symmetric edge installation
//!
//! Roles live in a flat arena and refer to each other by [`RoleId`]. Every
//! edge is stored twice (child id in the parent's `children`, parent id in the
//! child's `parents`); both entries are written together after the cycle
//! check has passed, so a rejected edge leaves the graph untouched.

use super::types::{RoleId, RoleNode, Specifier};
use crate::cache::PatternCache;
use crate::error::{RbacError, Relation, Result};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// Traversal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Parents,
    Children,
}

/// Arena of role records
#[derive(Debug)]
pub(crate) struct RoleGraph {
    id: u32,
    nodes: Vec<RoleNode>,
}

impl RoleGraph {
    /// Create an empty graph with a fresh identity
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Allocate a new, unconnected role record
    pub(crate) fn insert(&mut self, name: String) -> RoleId {
        let id = RoleId {
            graph: self.id,
            index: self.nodes.len() as u32,
        };
        self.nodes.push(RoleNode::new(name));
        id
    }

    /// Check that `id` was minted by this graph
    pub(crate) fn check(&self, id: RoleId) -> Result<RoleId> {
        if id.graph != self.id || id.index() >= self.nodes.len() {
            return Err(RbacError::InvalidRole(format!(
                "{} does not belong to this registry",
                id
            )));
        }
        Ok(id)
    }

    /// Node lookup for ids that already passed [`RoleGraph::check`]
    pub(crate) fn node(&self, id: RoleId) -> &RoleNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: RoleId) -> &mut RoleNode {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn name(&self, id: RoleId) -> &str {
        &self.node(id).name
    }

    /// Store specifiers on a role, compiling each through the shared cache
    pub(crate) fn add_permissions<I, S>(&mut self, id: RoleId, specs: I, cache: &PatternCache)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = self.node_mut(id);
        for spec in specs {
            let text = spec.into();
            if node.has_specifier(&text) {
                continue;
            }
            let pattern = cache.compile(&text);
            node.specifiers.push(Specifier { text, pattern });
        }
    }

    /// Depth-first walk starting at `start` (included), each role once
    pub(crate) fn walk(&self, start: RoleId, direction: Direction) -> Walk<'_> {
        Walk {
            graph: self,
            direction,
            stack: vec![start],
            visited: HashSet::new(),
        }
    }

    /// Own or inherited-from-descendant grant for `action`
    pub(crate) fn has_permission(&self, id: RoleId, action: &str) -> bool {
        self.walk(id, Direction::Children)
            .any(|role| self.node(role).grants(action))
    }

    pub(crate) fn permissions(&self, id: RoleId, include_descendants: bool) -> BTreeSet<String> {
        if !include_descendants {
            return self
                .node(id)
                .specifiers
                .iter()
                .map(|s| s.text.clone())
                .collect();
        }

        self.walk(id, Direction::Children)
            .flat_map(|role| self.node(role).specifiers.iter().map(|s| s.text.clone()))
            .collect()
    }

    pub(crate) fn has_ancestor(&self, id: RoleId, other: RoleId) -> bool {
        id != other && self.walk(id, Direction::Parents).any(|role| role == other)
    }

    pub(crate) fn has_descendant(&self, id: RoleId, other: RoleId) -> bool {
        id != other && self.walk(id, Direction::Children).any(|role| role == other)
    }

    /// Make `parent` a parent of `id`
    pub(crate) fn add_parent(&mut self, id: RoleId, parent: RoleId) -> Result<()> {
        if id == parent || self.has_descendant(id, parent) {
            return Err(RbacError::CircularReference {
                role: self.name(parent).to_string(),
                relation: Relation::Parent,
            });
        }

        self.link(parent, id);
        Ok(())
    }

    /// Make `child` a child of `id`
    pub(crate) fn add_child(&mut self, id: RoleId, child: RoleId) -> Result<()> {
        if id == child || self.has_ancestor(id, child) {
            return Err(RbacError::CircularReference {
                role: self.name(child).to_string(),
                relation: Relation::Child,
            });
        }

        self.link(id, child);
        Ok(())
    }

    /// Install both directions of an already validated edge
    fn link(&mut self, parent: RoleId, child: RoleId) {
        if self.node(parent).children.contains(&child) {
            return;
        }

        self.node_mut(parent).children.push(child);
        self.node_mut(child).parents.push(parent);

        debug!(
            "Linked role '{}' as parent of '{}'",
            self.name(parent),
            self.name(child)
        );
    }
}

/// Iterator over the roles reachable from a start role
pub(crate) struct Walk<'a> {
    graph: &'a RoleGraph,
    direction: Direction,
    stack: Vec<RoleId>,
    visited: HashSet<RoleId>,
}

impl Iterator for Walk<'_> {
    type Item = RoleId;

    fn next(&mut self) -> Option<RoleId> {
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }

            let graph = self.graph;
            let node = graph.node(id);
            let next = match self.direction {
                Direction::Parents => &node.parents,
                Direction::Children => &node.children,
            };
            self.stack.extend(next.iter().rev().copied());

            return Some(id);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(graph: &mut RoleGraph, names: &[&str]) -> Vec<RoleId> {
        let ids: Vec<_> = names.iter().map(|n| graph.insert(n.to_string())).collect();
        for pair in ids.windows(2) {
            graph.add_child(pair[0], pair[1]).unwrap();
        }
        ids
    }

    #[test]
    fn test_link_is_symmetric() {
        let mut graph = RoleGraph::new();
        let ids = chain(&mut graph, &["admin", "user"]);

        assert_eq!(graph.node(ids[0]).children, vec![ids[1]]);
        assert_eq!(graph.node(ids[1]).parents, vec![ids[0]]);
    }

    #[test]
    fn test_walk_visits_diamond_once() {
        // top -> (left, right) -> bottom
        let mut graph = RoleGraph::new();
        let top = graph.insert("top".into());
        let left = graph.insert("left".into());
        let right = graph.insert("right".into());
        let bottom = graph.insert("bottom".into());

        graph.add_child(top, left).unwrap();
        graph.add_child(top, right).unwrap();
        graph.add_child(left, bottom).unwrap();
        graph.add_child(right, bottom).unwrap();

        let visited: Vec<_> = graph.walk(top, Direction::Children).collect();
        assert_eq!(visited.len(), 4);
        assert_eq!(visited[0], top);

        let up: Vec<_> = graph.walk(bottom, Direction::Parents).collect();
        assert_eq!(up.len(), 4);
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut graph = RoleGraph::new();
        let a = graph.insert("a".into());

        assert!(matches!(
            graph.add_parent(a, a),
            Err(RbacError::CircularReference { .. })
        ));
        assert!(matches!(
            graph.add_child(a, a),
            Err(RbacError::CircularReference { .. })
        ));
        assert!(graph.node(a).parents.is_empty());
        assert!(graph.node(a).children.is_empty());
    }

    #[test]
    fn test_rejected_edge_leaves_graph_untouched() {
        let mut graph = RoleGraph::new();
        let ids = chain(&mut graph, &["a", "b", "c"]);

        let err = graph.add_child(ids[2], ids[0]).unwrap_err();
        assert!(matches!(
            err,
            RbacError::CircularReference { relation: Relation::Child, .. }
        ));

        assert!(graph.node(ids[2]).children.is_empty());
        assert!(graph.node(ids[0]).parents.is_empty());
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut one = RoleGraph::new();
        let two = RoleGraph::new();
        let id = one.insert("a".into());

        assert!(one.check(id).is_ok());
        assert!(matches!(two.check(id), Err(RbacError::InvalidRole(_))));
    }

    #[test]
    fn test_duplicate_specifiers_stored_once() {
        let cache = PatternCache::new();
        let mut graph = RoleGraph::new();
        let id = graph.insert("a".into());

        graph.add_permissions(id, ["read", "read", "write"], &cache);
        assert_eq!(graph.node(id).specifiers.len(), 2);
    }
}

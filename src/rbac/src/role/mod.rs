//! Role hierarchy
//!
//! Roles form a directed acyclic graph. A parent role sees every permission
//! held by its children and their descendants; a child never sees what is
//! above it.
//!
//! # Example
//!
//! ```rust
//! use cretoai_rbac::Rbac;
//!
//! # fn example() -> cretoai_rbac::Result<()> {
//! let mut rbac = Rbac::new();
//! rbac.add_role("admin")?;
//! rbac.add_role_with_parents("user", ["admin"])?;
//!
//! rbac.role_mut("admin")?.add_permissions(["user.create"]);
//! rbac.role_mut("user")?.add_permissions(["user.view"]);
//!
//! let admin = rbac.role("admin")?;
//! assert!(admin.has_permission("user.view"));
//! assert!(!rbac.role("user")?.has_permission("user.create"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub(crate) mod graph;
pub mod types;

#[cfg(test)]
mod tests;

pub(crate) use graph::RoleGraph;
pub use types::RoleId;

use crate::cache::PatternCache;
use crate::error::Result;
use graph::Direction;
use std::collections::BTreeSet;
use std::fmt;

/// Read-only view of one role
#[derive(Clone, Copy)]
pub struct Role<'a> {
    graph: &'a RoleGraph,
    id: RoleId,
}

impl<'a> Role<'a> {
    /// `id` must already be checked against `graph`
    pub(crate) fn new(graph: &'a RoleGraph, id: RoleId) -> Self {
        Self { graph, id }
    }

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.graph.name(self.id)
    }

    /// Whether this role, or any of its descendants, grants `action`
    pub fn has_permission(&self, action: &str) -> bool {
        self.graph.has_permission(self.id, action)
    }

    /// Specifier texts of this role, optionally with every descendant's
    pub fn permissions(&self, include_descendants: bool) -> BTreeSet<String> {
        self.graph.permissions(self.id, include_descendants)
    }

    /// Immediate parents, in insertion order
    pub fn parents(&self) -> impl Iterator<Item = Role<'a>> + 'a {
        let graph = self.graph;
        graph
            .node(self.id)
            .parents
            .iter()
            .map(move |&id| Role::new(graph, id))
    }

    /// Immediate children, in insertion order
    pub fn children(&self) -> impl Iterator<Item = Role<'a>> + 'a {
        let graph = self.graph;
        graph
            .node(self.id)
            .children
            .iter()
            .map(move |&id| Role::new(graph, id))
    }

    /// Every role below this one, each once
    pub fn descendants(&self) -> impl Iterator<Item = Role<'a>> + 'a {
        let graph = self.graph;
        graph
            .walk(self.id, Direction::Children)
            .skip(1)
            .map(move |id| Role::new(graph, id))
    }

    pub fn has_ancestor(&self, other: impl Into<RoleId>) -> bool {
        self.graph.has_ancestor(self.id, other.into())
    }

    pub fn has_descendant(&self, other: impl Into<RoleId>) -> bool {
        self.graph.has_descendant(self.id, other.into())
    }
}

impl From<Role<'_>> for RoleId {
    fn from(role: Role<'_>) -> Self {
        role.id
    }
}

impl From<&Role<'_>> for RoleId {
    fn from(role: &Role<'_>) -> Self {
        role.id
    }
}

impl PartialEq for Role<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Role<'_> {}

impl fmt::Display for Role<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Role<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

/// Mutable access to one role
pub struct RoleMut<'a> {
    graph: &'a mut RoleGraph,
    patterns: &'a PatternCache,
    id: RoleId,
}

impl<'a> RoleMut<'a> {
    pub(crate) fn new(graph: &'a mut RoleGraph, patterns: &'a PatternCache, id: RoleId) -> Self {
        Self { graph, patterns, id }
    }

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.graph.name(self.id)
    }

    /// Add permission specifiers.
    ///
    /// Each specifier is compiled as a pattern when possible; specifiers that
    /// do not compile still match their exact text.
    pub fn add_permissions<I, S>(&mut self, specs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.graph.add_permissions(self.id, specs, self.patterns);
        self
    }

    /// Make `parent` a parent of this role.
    ///
    /// No-op when the edge already exists. Fails with
    /// [`RbacError::CircularReference`](crate::RbacError::CircularReference)
    /// when `parent` is this role or one of its descendants.
    pub fn add_parent(&mut self, parent: impl Into<RoleId>) -> Result<()> {
        let parent = self.graph.check(parent.into())?;
        self.graph.add_parent(self.id, parent)
    }

    /// Make `child` a child of this role.
    ///
    /// No-op when the edge already exists. Fails with
    /// [`RbacError::CircularReference`](crate::RbacError::CircularReference)
    /// when `child` is this role or one of its ancestors.
    pub fn add_child(&mut self, child: impl Into<RoleId>) -> Result<()> {
        let child = self.graph.check(child.into())?;
        self.graph.add_child(self.id, child)
    }

    /// Read-only view of the same role
    pub fn as_role(&self) -> Role<'_> {
        Role::new(self.graph, self.id)
    }
}

impl fmt::Debug for RoleMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleMut")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

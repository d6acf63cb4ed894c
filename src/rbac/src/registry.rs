//! Role registry and grant evaluation
//!
//! [`Rbac`] owns the role graph, maps role names to registered roles, and is
//! the single entry point for grant checks.

use crate::assertion::{self, SharedAssertion};
use crate::cache::PatternCache;
use crate::context::Context;
use crate::error::{RbacError, Result};
use crate::role::{Role, RoleGraph, RoleId, RoleMut};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A role given either by name or by handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleRef {
    Name(String),
    Handle(RoleId),
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<&String> for RoleRef {
    fn from(name: &String) -> Self {
        RoleRef::Name(name.clone())
    }
}

impl From<RoleId> for RoleRef {
    fn from(id: RoleId) -> Self {
        RoleRef::Handle(id)
    }
}

impl From<Role<'_>> for RoleRef {
    fn from(role: Role<'_>) -> Self {
        RoleRef::Handle(role.id())
    }
}

impl From<&Role<'_>> for RoleRef {
    fn from(role: &Role<'_>) -> Self {
        RoleRef::Handle(role.id())
    }
}

/// Role registry
#[derive(Debug)]
pub struct Rbac {
    graph: RoleGraph,
    roles: HashMap<String, RoleId>,
    create_missing_roles: bool,
    patterns: Arc<PatternCache>,
}

impl Rbac {
    /// Create an empty registry with its own pattern cache
    pub fn new() -> Self {
        Self::with_pattern_cache(Arc::new(PatternCache::new()))
    }

    /// Create an empty registry that compiles through a shared cache
    pub fn with_pattern_cache(patterns: Arc<PatternCache>) -> Self {
        Self {
            graph: RoleGraph::new(),
            roles: HashMap::new(),
            create_missing_roles: false,
            patterns,
        }
    }

    pub fn pattern_cache(&self) -> &Arc<PatternCache> {
        &self.patterns
    }

    /// Auto-register unknown roles referenced by name while wiring the graph
    pub fn set_create_missing_roles(&mut self, create_missing_roles: bool) -> &mut Self {
        self.create_missing_roles = create_missing_roles;
        self
    }

    pub fn create_missing_roles(&self) -> bool {
        self.create_missing_roles
    }

    /// Create a role that is not registered yet
    pub fn new_role(&mut self, name: impl Into<String>) -> RoleId {
        self.graph.insert(name.into())
    }

    /// Registered roles, in no particular order
    pub fn roles(&self) -> impl Iterator<Item = Role<'_>> + '_ {
        self.roles.values().map(move |&id| Role::new(&self.graph, id))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Registered role by name
    pub fn role(&self, name: &str) -> Result<Role<'_>> {
        match self.roles.get(name) {
            Some(&id) => Ok(Role::new(&self.graph, id)),
            None => Err(RbacError::RoleNotFound(name.to_string())),
        }
    }

    /// Any role record of this registry, registered or not
    pub fn role_by_id(&self, id: RoleId) -> Result<Role<'_>> {
        let id = self.graph.check(id)?;
        Ok(Role::new(&self.graph, id))
    }

    /// Mutable access to a role.
    ///
    /// Names resolve to registered roles; handles may also address roles
    /// that are not registered yet.
    pub fn role_mut(&mut self, role: impl Into<RoleRef>) -> Result<RoleMut<'_>> {
        let id = match role.into() {
            RoleRef::Name(name) => self.lookup(&name)?,
            RoleRef::Handle(id) => self.graph.check(id)?,
        };
        Ok(RoleMut::new(&mut self.graph, &self.patterns, id))
    }

    /// Whether the role is registered.
    ///
    /// A handle only counts when it is the very role stored under its name.
    pub fn has_role(&self, role: impl Into<RoleRef>) -> Result<bool> {
        match role.into() {
            RoleRef::Name(name) => Ok(self.roles.contains_key(&name)),
            RoleRef::Handle(id) => {
                let id = self.graph.check(id)?;
                Ok(self.roles.get(self.graph.name(id)) == Some(&id))
            }
        }
    }

    /// Register a role.
    ///
    /// A name creates a fresh role; a handle registers that role under its
    /// name. An existing registration under the same name is replaced.
    pub fn add_role(&mut self, role: impl Into<RoleRef>) -> Result<RoleId> {
        self.add_role_with_parents(role, std::iter::empty::<RoleRef>())
    }

    /// Register a role and make each of `parents` one of its parents.
    ///
    /// Parents are linked in order. An unknown parent is registered first
    /// when [`create_missing_roles`](Self::create_missing_roles) is on and
    /// fails with [`RbacError::RoleNotFound`] otherwise. Linking stops at the
    /// first failure; parents linked before it stay linked and the role is
    /// not registered.
    pub fn add_role_with_parents<I, P>(&mut self, role: impl Into<RoleRef>, parents: I) -> Result<RoleId>
    where
        I: IntoIterator<Item = P>,
        P: Into<RoleRef>,
    {
        let id = match role.into() {
            RoleRef::Name(name) => self.graph.insert(name),
            RoleRef::Handle(id) => self.graph.check(id)?,
        };

        for parent in parents {
            let parent = parent.into();

            if self.create_missing_roles && !self.has_role(parent.clone())? {
                debug!("Creating missing parent role {:?}", parent);
                self.add_role(parent.clone())?;
            }

            let parent_id = self.resolve(&parent)?;
            self.graph.add_child(parent_id, id)?;
        }

        let name = self.graph.name(id).to_string();
        if let Some(previous) = self.roles.insert(name.clone(), id) {
            if previous != id {
                debug!("Role '{}' replaced by a new registration", name);
            }
        }

        Ok(id)
    }

    /// Grant check that folds every failure into `false`
    pub fn is_granted(
        &self,
        ctx: &Context,
        role: impl Into<RoleRef>,
        action: &str,
        assertions: &[SharedAssertion],
    ) -> bool {
        matches!(self.is_granted_e(ctx, role, action, assertions), Ok(true))
    }

    /// Grant check with an explanation.
    ///
    /// `Ok(false)` is a plain denial (no permission, or an assertion said
    /// no). `Err` means the role is unknown or an assertion failed or
    /// panicked; the remaining assertions are then skipped.
    pub fn is_granted_e(
        &self,
        ctx: &Context,
        role: impl Into<RoleRef>,
        action: &str,
        assertions: &[SharedAssertion],
    ) -> Result<bool> {
        let role = self.resolve(&role.into())?;
        let role = Role::new(&self.graph, role);

        if !role.has_permission(action) {
            debug!("Role '{}' lacks permission '{}'", role.name(), action);
            return Ok(false);
        }

        for a in assertions {
            if !assertion::evaluate(a.as_ref(), ctx, role, action)? {
                debug!("Assertion rejected '{}' for role '{}'", action, role.name());
                return Ok(false);
            }
        }

        debug!("Role '{}' granted '{}'", role.name(), action);
        Ok(true)
    }

    /// Registered role id for a name or handle
    pub(crate) fn resolve(&self, role: &RoleRef) -> Result<RoleId> {
        match role {
            RoleRef::Name(name) => self.lookup(name),
            RoleRef::Handle(id) => {
                let id = self.graph.check(*id)?;
                let name = self.graph.name(id);
                match self.roles.get(name) {
                    Some(&registered) if registered == id => Ok(id),
                    _ => Err(RbacError::RoleNotFound(name.to_string())),
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<RoleId> {
        self.roles
            .get(name)
            .copied()
            .ok_or_else(|| RbacError::RoleNotFound(name.to_string()))
    }

    /// Registered role, created on demand when auto-creation is on
    pub(crate) fn lookup_or_create(&mut self, name: &str) -> Result<RoleId> {
        match self.lookup(name) {
            Err(RbacError::RoleNotFound(_)) if self.create_missing_roles => {
                debug!("Creating missing role '{}'", name);
                self.add_role(name)
            }
            other => other,
        }
    }
}

impl Default for Rbac {
    fn default() -> Self {
        Self::new()
    }
}

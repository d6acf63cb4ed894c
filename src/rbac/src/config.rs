//! Declarative registry configuration
//!
//! A configuration describes the role hierarchy and the permissions of each
//! role. It is applied in order: every role in `roleHierarchy` is registered
//! first, then the edges are wired, then `accessControl` permissions are
//! attached.
//!
//! ```json
//! {
//!   "createMissingRoles": true,
//!   "roleHierarchy": [
//!     { "role": "admin", "children": ["user"] },
//!     { "role": "user" }
//!   ],
//!   "accessControl": [
//!     { "role": "admin", "permissions": ["user.create"] },
//!     { "role": "user", "permissions": ["user.view"] }
//!   ]
//! }
//! ```

use crate::error::Result;
use crate::registry::Rbac;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::info;

/// Registry configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RbacConfig {
    /// Register unknown roles referenced by edges or permissions
    #[serde(default)]
    pub create_missing_roles: bool,

    #[serde(default)]
    pub role_hierarchy: Vec<RoleConfig>,

    #[serde(default)]
    pub access_control: Vec<AccessConfig>,
}

/// One role and its immediate relatives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub role: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

/// Permissions attached to one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub role: String,

    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RbacConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

impl Rbac {
    /// Build a registry from a configuration
    pub fn with_config(config: &RbacConfig) -> Result<Self> {
        let mut rbac = Rbac::new();
        rbac.apply(config)?;
        Ok(rbac)
    }

    /// Apply a configuration on top of the current registry.
    ///
    /// Stops at the first error; whatever was applied before it stays.
    pub fn apply(&mut self, config: &RbacConfig) -> Result<()> {
        self.set_create_missing_roles(config.create_missing_roles);

        for role in &config.role_hierarchy {
            self.add_role(role.role.as_str())?;
        }

        for role in &config.role_hierarchy {
            let id = self.lookup_or_create(&role.role)?;

            for parent in &role.parents {
                let parent = self.lookup_or_create(parent)?;
                self.role_mut(id)?.add_parent(parent)?;
            }

            for child in &role.children {
                let child = self.lookup_or_create(child)?;
                self.role_mut(id)?.add_child(child)?;
            }
        }

        for access in &config.access_control {
            if access.permissions.is_empty() {
                continue;
            }
            let id = self.lookup_or_create(&access.role)?;
            self.role_mut(id)?.add_permissions(&access.permissions);
        }

        info!(
            "Applied RBAC config: {} roles in hierarchy, {} access entries",
            config.role_hierarchy.len(),
            config.access_control.len()
        );

        Ok(())
    }
}

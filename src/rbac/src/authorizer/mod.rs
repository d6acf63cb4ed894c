//! Subject-to-decision translation
//!
//! An [`Authorizer`] turns a subject's claims and a requested [`Target`] into
//! a binary [`Decision`]. [`DefaultAuthorizer`] tries the subject's identifier
//! and then each of its roles against the registry; the first grant wins.

pub mod request;

pub use request::{
    default_actions, ActionExtractor, PooledTarget, RequestAssertions, RequestAuthorizer,
    RequestInfo, TargetPool,
};

use crate::assertion::SharedAssertion;
use crate::context::Context;
use crate::error::{RbacError, Result};
use crate::registry::Rbac;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An authenticated caller
pub trait Subject: fmt::Debug + Send + Sync {
    /// Identifier, tried as a role name before any declared role
    fn identifier(&self) -> &str;

    /// Declared role names, in the order they should be tried
    fn roles(&self) -> &[String];
}

/// Plain subject carried over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier (e.g., "user:alice@example.com")
    pub id: String,

    /// Declared roles
    #[serde(default)]
    pub roles: Vec<String>,

    /// Additional principal attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl Subject for Principal {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }
}

/// What the authentication layer established about the caller
#[derive(Debug, Clone, Default)]
pub struct Claims {
    pub subject: Option<Arc<dyn Subject>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn new(subject: impl Subject + 'static) -> Self {
        Self {
            subject: Some(Arc::new(subject)),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One authorization request
#[derive(Clone, Default)]
pub struct Target {
    pub action: String,
    pub assertions: Vec<SharedAssertion>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Target {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_assertion(mut self, assertion: SharedAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Clear every field
    pub fn reset(&mut self) {
        self.action.clear();
        self.assertions.clear();
        self.metadata.clear();
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("action", &self.action)
            .field("assertions", &self.assertions.len())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Authorization outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Deny,
    Allow,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Deny => f.write_str("deny"),
            Decision::Allow => f.write_str("allow"),
        }
    }
}

/// Decision plus the explanation for a denial
#[derive(Debug)]
pub struct AuthDecision {
    pub decision: Decision,
    /// Always `Some` for [`Decision::Deny`], `None` for [`Decision::Allow`]
    pub error: Option<RbacError>,
}

impl AuthDecision {
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            error: None,
        }
    }

    pub fn deny(error: RbacError) -> Self {
        Self {
            decision: Decision::Deny,
            error: Some(error),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }

    /// `Ok(())` on allow, the denial reason otherwise
    pub fn into_result(self) -> Result<()> {
        match self.decision {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(self.error.unwrap_or(RbacError::Deny)),
        }
    }
}

/// Claims-and-target to decision
pub trait Authorizer: Send + Sync {
    fn authorize(&self, ctx: &Context, claims: Option<&Claims>, target: Option<&Target>) -> AuthDecision;
}

impl<A: Authorizer + ?Sized> Authorizer for Arc<A> {
    fn authorize(&self, ctx: &Context, claims: Option<&Claims>, target: Option<&Target>) -> AuthDecision {
        (**self).authorize(ctx, claims, target)
    }
}

/// Registry-backed authorizer
#[derive(Debug, Clone)]
pub struct DefaultAuthorizer {
    rbac: Arc<Rbac>,
}

impl DefaultAuthorizer {
    pub fn new(rbac: Arc<Rbac>) -> Self {
        Self { rbac }
    }

    pub fn rbac(&self) -> &Arc<Rbac> {
        &self.rbac
    }
}

impl Authorizer for DefaultAuthorizer {
    /// Try the subject's identifier, then each declared role.
    ///
    /// Denials carry [`RbacError::Deny`] joined with every candidate error
    /// encountered, in candidate order.
    fn authorize(&self, ctx: &Context, claims: Option<&Claims>, target: Option<&Target>) -> AuthDecision {
        let Some(target) = target.filter(|t| !t.action.is_empty()) else {
            return AuthDecision::deny(RbacError::Deny);
        };
        let Some(subject) = claims.and_then(|c| c.subject.as_deref()) else {
            return AuthDecision::deny(RbacError::Deny);
        };

        let candidates = std::iter::once(subject.identifier())
            .chain(subject.roles().iter().map(String::as_str));

        let mut errors = vec![RbacError::Deny];
        for candidate in candidates {
            match self
                .rbac
                .is_granted_e(ctx, candidate, &target.action, &target.assertions)
            {
                Ok(true) => {
                    debug!(
                        "Allowed '{}' for subject '{}' via '{}'",
                        target.action,
                        subject.identifier(),
                        candidate
                    );
                    return AuthDecision::allow();
                }
                Ok(false) => {}
                Err(e) => errors.push(e),
            }
        }

        debug!(
            "Denied '{}' for subject '{}'",
            target.action,
            subject.identifier()
        );
        AuthDecision::deny(RbacError::join(errors).unwrap_or(RbacError::Deny))
    }
}

//! # CretoAI RBAC Engine
//!
//! Embeddable role-based access control: roles form a hierarchy, permissions
//! flow upward from children to parents, and grant checks may be refined by
//! context-dependent assertions.
//!
//! ## Features
//!
//! - **Role hierarchy** as a cycle-free graph with symmetric parent/child edges
//! - **Pattern permissions** compiled once and shared through a [`PatternCache`]
//! - **Assertions** evaluated in order, with panics converted into errors
//! - **Authorizer** mapping a subject's claims to an allow/deny [`Decision`]
//! - **Request adapter** deriving actions from HTTP requests
//! - **Declarative config** loaded from JSON
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{Authorizer, Claims, Context, DefaultAuthorizer, Principal, Rbac, Target};
//! use std::sync::Arc;
//!
//! # fn main() -> cretoai_rbac::Result<()> {
//! let mut rbac = Rbac::new();
//! rbac.add_role("editor")?;
//! rbac.add_role_with_parents("viewer", ["editor"])?;
//! rbac.role_mut("editor")?.add_permissions(["post.edit"]);
//! rbac.role_mut("viewer")?.add_permissions(["post.view"]);
//!
//! let authorizer = DefaultAuthorizer::new(Arc::new(rbac));
//! let claims = Claims::new(Principal::new("alice").with_roles(["editor"]));
//!
//! let decision = authorizer.authorize(&Context::new(), Some(&claims), Some(&Target::new("post.view")));
//! assert!(decision.is_allowed());
//! # Ok(())
//! # }
//! ```

pub mod assertion;
pub mod authorizer;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod role;

// Re-export commonly used types
pub use assertion::{assertion_fn, Assertion, AssertionFn, SharedAssertion};
pub use authorizer::{
    default_actions, AuthDecision, Authorizer, Claims, Decision, DefaultAuthorizer, Principal,
    RequestAssertions, RequestAuthorizer, RequestInfo, Subject, Target, TargetPool,
};
pub use cache::{CacheStats, PatternCache};
pub use config::{AccessConfig, RbacConfig, RoleConfig};
pub use context::Context;
pub use error::{BoxError, ErrorKind, RbacError, Relation, Result};
pub use registry::{Rbac, RoleRef};
pub use role::{Role, RoleId, RoleMut};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

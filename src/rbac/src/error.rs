//! Error types for the RBAC engine

use std::fmt;
use thiserror::Error;

/// Boxed error returned by assertion implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which side of an edge a rejected role would have occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Parent,
    Child,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Parent => f.write_str("parent"),
            Relation::Child => f.write_str("child"),
        }
    }
}

/// RBAC engine errors
#[derive(Debug, Error)]
pub enum RbacError {
    /// No role is registered under the given name
    #[error("role not found: no role with name \"{0}\" could be found")]
    RoleNotFound(String),

    /// Installing the edge would close a cycle in the role graph
    #[error(
        "circular reference detected: to prevent circular references, you cannot add role \"{role}\" as {relation}"
    )]
    CircularReference { role: String, relation: Relation },

    /// Baseline deny
    #[error("deny")]
    Deny,

    /// Role handle that does not belong to this registry
    #[error("invalid role reference: {0}")]
    InvalidRole(String),

    /// An assertion returned an error
    #[error("assertion failed: {0}")]
    Assertion(#[source] BoxError),

    /// An assertion panicked while being evaluated
    #[error("assertion panicked: {0}")]
    AssertionPanic(String),

    /// Several errors collected while trying multiple candidates
    #[error("{}", join_messages(.0))]
    Joined(Vec<RbacError>),
}

/// Stable identity of an [`RbacError`], independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RoleNotFound,
    CircularReference,
    Deny,
    InvalidRole,
    Assertion,
    AssertionPanic,
}

impl RbacError {
    /// Identity of this error. `None` for [`RbacError::Joined`].
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RbacError::RoleNotFound(_) => Some(ErrorKind::RoleNotFound),
            RbacError::CircularReference { .. } => Some(ErrorKind::CircularReference),
            RbacError::Deny => Some(ErrorKind::Deny),
            RbacError::InvalidRole(_) => Some(ErrorKind::InvalidRole),
            RbacError::Assertion(_) => Some(ErrorKind::Assertion),
            RbacError::AssertionPanic(_) => Some(ErrorKind::AssertionPanic),
            RbacError::Joined(_) => None,
        }
    }

    /// Whether this error, or any error joined into it, has the given kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        match self {
            RbacError::Joined(errors) => errors.iter().any(|e| e.is(kind)),
            other => other.kind() == Some(kind),
        }
    }

    /// Flattened view over every leaf error
    pub fn leaves(&self) -> Vec<&RbacError> {
        match self {
            RbacError::Joined(errors) => errors.iter().flat_map(|e| e.leaves()).collect(),
            other => vec![other],
        }
    }

    /// Join errors the way multi-candidate evaluation aggregates them.
    ///
    /// A single error is returned unchanged; an empty list yields `None`.
    pub fn join(mut errors: Vec<RbacError>) -> Option<RbacError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(RbacError::Joined(errors)),
        }
    }
}

fn join_messages(errors: &[RbacError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for RBAC operations
pub type Result<T> = std::result::Result<T, RbacError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_identity() {
        assert_eq!(
            RbacError::RoleNotFound("x".into()).kind(),
            Some(ErrorKind::RoleNotFound)
        );
        assert_eq!(RbacError::Deny.kind(), Some(ErrorKind::Deny));
        assert!(RbacError::Joined(vec![]).kind().is_none());
    }

    #[test]
    fn test_joined_preserves_identity() {
        let err = RbacError::Joined(vec![
            RbacError::Deny,
            RbacError::Joined(vec![RbacError::RoleNotFound("ghost".into())]),
        ]);

        assert!(err.is(ErrorKind::Deny));
        assert!(err.is(ErrorKind::RoleNotFound));
        assert!(!err.is(ErrorKind::CircularReference));
        assert_eq!(err.leaves().len(), 2);
    }

    #[test]
    fn test_joined_message() {
        let err = RbacError::Joined(vec![
            RbacError::Deny,
            RbacError::RoleNotFound("ghost".into()),
        ]);
        let msg = err.to_string();

        assert!(msg.starts_with("deny\n"));
        assert!(msg.contains("no role with name \"ghost\""));
    }

    #[test]
    fn test_join_helper() {
        assert!(RbacError::join(vec![]).is_none());
        assert!(matches!(
            RbacError::join(vec![RbacError::Deny]),
            Some(RbacError::Deny)
        ));
        assert!(matches!(
            RbacError::join(vec![RbacError::Deny, RbacError::Deny]),
            Some(RbacError::Joined(_))
        ));
    }

    #[test]
    fn test_assertion_source() {
        use std::error::Error as _;

        let err = RbacError::Assertion("boom".into());
        assert!(err.to_string().contains("boom"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_circular_reference_message() {
        let err = RbacError::CircularReference {
            role: "admin".into(),
            relation: Relation::Child,
        };
        assert!(err.to_string().contains("cannot add role \"admin\" as child"));
    }
}

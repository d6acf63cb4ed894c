//! Role hierarchy scenarios
//!
//! These tests drive the graph through the registry, the way callers build
//! it, and check inheritance, cycle rejection and matching rules.

use crate::error::{ErrorKind, RbacError, Relation};
use crate::{Context, Rbac};

fn granted(rbac: &Rbac, role: &str, action: &str) -> bool {
    rbac.is_granted(&Context::new(), role, action, &[])
}

// ============================================================================
// Inheritance Tests
// ============================================================================

#[test]
fn test_parent_sees_child_permissions() {
    let mut rbac = Rbac::new();
    rbac.add_role("admin").unwrap();
    rbac.role_mut("admin").unwrap().add_permissions(["user.create"]);

    rbac.add_role_with_parents("user", ["admin"]).unwrap();
    rbac.role_mut("user").unwrap().add_permissions(["user.view"]);

    assert!(granted(&rbac, "admin", "user.view"));
    assert!(granted(&rbac, "admin", "user.create"));
    assert!(granted(&rbac, "user", "user.view"));
    assert!(!granted(&rbac, "user", "user.create"));
}

#[test]
fn test_shared_child_of_two_parents() {
    let mut rbac = Rbac::new();
    rbac.add_role("editor").unwrap();
    rbac.add_role("manager").unwrap();
    rbac.role_mut("editor").unwrap().add_permissions(["post.edit"]);
    rbac.role_mut("manager").unwrap().add_permissions(["post.publish"]);

    rbac.add_role_with_parents("viewer", ["editor", "manager"]).unwrap();
    rbac.role_mut("viewer").unwrap().add_permissions(["post.view"]);

    assert!(granted(&rbac, "editor", "post.view"));
    assert!(granted(&rbac, "manager", "post.view"));
    assert!(!granted(&rbac, "viewer", "post.edit"));
    assert!(!granted(&rbac, "editor", "post.publish"));

    let viewer = rbac.role("viewer").unwrap();
    let parents: Vec<_> = viewer.parents().map(|r| r.name()).collect();
    assert_eq!(parents, vec!["editor", "manager"]);
}

#[test]
fn test_permission_added_to_child_widens_ancestors() {
    let mut rbac = Rbac::new();
    rbac.add_role("top").unwrap();
    rbac.add_role_with_parents("middle", ["top"]).unwrap();
    rbac.add_role_with_parents("bottom", ["middle"]).unwrap();

    assert!(!granted(&rbac, "top", "report.export"));

    rbac.role_mut("bottom").unwrap().add_permissions(["report.export"]);

    assert!(granted(&rbac, "top", "report.export"));
    assert!(granted(&rbac, "middle", "report.export"));
}

#[test]
fn test_permissions_listing() {
    let mut rbac = Rbac::new();
    rbac.add_role("admin").unwrap();
    rbac.add_role_with_parents("user", ["admin"]).unwrap();
    rbac.role_mut("admin").unwrap().add_permissions(["user.create"]);
    rbac.role_mut("user").unwrap().add_permissions(["user.view"]);

    let admin = rbac.role("admin").unwrap();
    assert_eq!(admin.permissions(false).len(), 1);

    let all: Vec<_> = admin.permissions(true).into_iter().collect();
    assert_eq!(all, vec!["user.create".to_string(), "user.view".to_string()]);
}

// ============================================================================
// Cycle Tests
// ============================================================================

#[test]
fn test_transitive_cycle_rejected() {
    let mut rbac = Rbac::new();
    let a = rbac.add_role("a").unwrap();
    let b = rbac.add_role("b").unwrap();
    let c = rbac.add_role("c").unwrap();

    rbac.role_mut(a).unwrap().add_child(b).unwrap();
    rbac.role_mut(b).unwrap().add_child(c).unwrap();

    let err = rbac.role_mut(c).unwrap().add_child(a).unwrap_err();
    assert!(err.is(ErrorKind::CircularReference));
    assert_eq!(
        err.to_string(),
        "circular reference detected: to prevent circular references, you cannot add role \"a\" as child"
    );

    let err = rbac.role_mut(a).unwrap().add_parent(c).unwrap_err();
    assert!(matches!(
        err,
        RbacError::CircularReference { relation: Relation::Parent, .. }
    ));

    // Rejected edges leave no trace.
    let c_role = rbac.role("c").unwrap();
    assert_eq!(c_role.children().count(), 0);
    assert!(!c_role.has_descendant(a));
}

#[test]
fn test_cycle_through_registration_rejected() {
    let mut rbac = Rbac::new();
    rbac.add_role("a").unwrap();
    rbac.add_role_with_parents("b", ["a"]).unwrap();

    let b = rbac.role("b").unwrap().id();
    let a = rbac.role("a").unwrap().id();

    let err = rbac.add_role_with_parents(a, [b]).unwrap_err();
    assert!(err.is(ErrorKind::CircularReference));
}

#[test]
fn test_add_parent_is_idempotent() {
    let mut rbac = Rbac::new();
    let parent = rbac.add_role("parent").unwrap();
    let child = rbac.add_role("child").unwrap();

    rbac.role_mut(child).unwrap().add_parent(parent).unwrap();
    rbac.role_mut(child).unwrap().add_parent(parent).unwrap();
    rbac.role_mut(parent).unwrap().add_child(child).unwrap();

    let child_role = rbac.role("child").unwrap();
    let parent_role = rbac.role("parent").unwrap();
    assert_eq!(child_role.parents().count(), 1);
    assert_eq!(parent_role.children().count(), 1);
}

#[test]
fn test_relationship_queries_after_add_child() {
    let mut rbac = Rbac::new();
    let grand = rbac.add_role("grand").unwrap();
    let parent = rbac.add_role("parent").unwrap();
    let child = rbac.add_role("child").unwrap();

    rbac.role_mut(grand).unwrap().add_child(parent).unwrap();
    rbac.role_mut(parent).unwrap().add_child(child).unwrap();

    let grand_role = rbac.role("grand").unwrap();
    let child_role = rbac.role("child").unwrap();

    assert!(grand_role.has_descendant(child));
    assert!(child_role.has_ancestor(grand));
    assert!(!child_role.has_descendant(grand));
    assert!(!grand_role.has_ancestor(child));
    assert!(!grand_role.has_descendant(grand));

    let below: Vec<_> = grand_role.descendants().map(|r| r.name()).collect();
    assert_eq!(below, vec!["parent", "child"]);
}

// ============================================================================
// Matching Tests
// ============================================================================

#[test]
fn test_star_is_literal_only() {
    let mut rbac = Rbac::new();
    rbac.add_role("root").unwrap();
    rbac.role_mut("root").unwrap().add_permissions(["*"]);

    assert!(granted(&rbac, "root", "*"));
    assert!(!granted(&rbac, "root", "post.edit"));
    assert_eq!(rbac.pattern_cache().stats().literal_only, 1);
}

#[test]
fn test_patterns_match_anywhere() {
    let mut rbac = Rbac::new();
    rbac.add_role("reader").unwrap();
    rbac.role_mut("reader").unwrap().add_permissions(["read"]);

    assert!(granted(&rbac, "reader", "read"));
    assert!(granted(&rbac, "reader", "unread"));
    assert!(granted(&rbac, "reader", "reader.list"));
    assert!(!granted(&rbac, "reader", "write"));
}

#[test]
fn test_anchored_pattern() {
    let mut rbac = Rbac::new();
    rbac.add_role("posts").unwrap();
    rbac.role_mut("posts").unwrap().add_permissions([r"^post\.(view|edit)$"]);

    assert!(granted(&rbac, "posts", "post.view"));
    assert!(granted(&rbac, "posts", "post.edit"));
    assert!(!granted(&rbac, "posts", "post.viewer"));
    assert!(!granted(&rbac, "posts", "post.delete"));
}

#[test]
fn test_handle_and_name_agree() {
    let mut rbac = Rbac::new();
    let id = rbac.add_role("admin").unwrap();
    rbac.role_mut("admin").unwrap().add_permissions(["x"]);

    let ctx = Context::new();
    assert_eq!(
        rbac.is_granted(&ctx, "admin", "x", &[]),
        rbac.is_granted(&ctx, id, "x", &[])
    );
}

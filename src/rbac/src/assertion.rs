//! Context-dependent assertions evaluated after a permission match
//!
//! Assertions are externally supplied policy hooks. They run synchronously on
//! the caller's thread, and [`evaluate`] is the trust boundary around them: a
//! panic inside an assertion is caught and turned into
//! [`RbacError::AssertionPanic`].

use crate::context::Context;
use crate::error::{BoxError, RbacError, Result};
use crate::role::Role;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Predicate checked after the role's permission surface matched
pub trait Assertion: Send + Sync {
    /// `Ok(false)` denies, `Err` denies with an explanation
    fn assert(&self, ctx: &Context, role: Role<'_>, action: &str) -> std::result::Result<bool, BoxError>;
}

/// Shared assertion handle
pub type SharedAssertion = Arc<dyn Assertion>;

/// Adapter turning a closure into an [`Assertion`]
pub struct AssertionFn<F>(F);

impl<F> AssertionFn<F>
where
    F: Fn(&Context, Role<'_>, &str) -> std::result::Result<bool, BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Assertion for AssertionFn<F>
where
    F: Fn(&Context, Role<'_>, &str) -> std::result::Result<bool, BoxError> + Send + Sync,
{
    fn assert(&self, ctx: &Context, role: Role<'_>, action: &str) -> std::result::Result<bool, BoxError> {
        (self.0)(ctx, role, action)
    }
}

impl<F> fmt::Debug for AssertionFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AssertionFn")
    }
}

/// Wrap a closure as a shared assertion
pub fn assertion_fn<F>(f: F) -> SharedAssertion
where
    F: Fn(&Context, Role<'_>, &str) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
{
    Arc::new(AssertionFn::new(f))
}

/// Run one assertion, converting errors and panics into [`RbacError`]
pub(crate) fn evaluate(
    assertion: &dyn Assertion,
    ctx: &Context,
    role: Role<'_>,
    action: &str,
) -> Result<bool> {
    match catch_unwind(AssertUnwindSafe(|| assertion.assert(ctx, role, action))) {
        Ok(Ok(passed)) => Ok(passed),
        Ok(Err(e)) => {
            warn!("Assertion for role '{}' failed: {}", role.name(), e);
            Err(RbacError::Assertion(e))
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            warn!("Assertion for role '{}' panicked: {}", role.name(), msg);
            Err(RbacError::AssertionPanic(msg))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = panic.downcast_ref::<RbacError>() {
        e.to_string()
    } else {
        "unknown panic".to_string()
    }
}

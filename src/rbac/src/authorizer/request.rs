//! HTTP request adapter
//!
//! Derives action candidates from an incoming request and runs them through
//! an [`Authorizer`]. Claims and extra assertions are picked up from the
//! request extensions, where an authentication layer is expected to put them.

use super::{AuthDecision, Authorizer, Claims, Target};
use crate::assertion::SharedAssertion;
use crate::context::Context;
use crate::error::RbacError;
use axum::http::{uri::Scheme, HeaderMap, Method, Request, Uri, Version};
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

/// Idle targets kept by a [`TargetPool`] unless configured otherwise
const DEFAULT_MAX_IDLE: usize = 64;

/// Transport facts about the request being authorized
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub host: Option<String>,
    pub headers: HeaderMap,
    pub version: Version,
    pub is_tls: bool,
}

impl RequestInfo {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let uri = req.uri().clone();
        let host = req
            .headers()
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()));
        let is_tls = uri.scheme() == Some(&Scheme::HTTPS);

        Self {
            method: req.method().clone(),
            host,
            headers: req.headers().clone(),
            version: req.version(),
            is_tls,
            uri,
        }
    }

    /// Request path, `/` when empty
    pub fn path(&self) -> &str {
        match self.uri.path() {
            "" => "/",
            path => path,
        }
    }
}

/// `*`, the method, the path, then `METHOD PATH`
pub fn default_actions(info: &RequestInfo) -> Vec<String> {
    let method = info.method.as_str();
    let path = info.path();

    vec![
        "*".to_string(),
        method.to_string(),
        path.to_string(),
        format!("{} {}", method, path),
    ]
}

/// Extra assertions attached to a request
#[derive(Clone, Default)]
pub struct RequestAssertions(pub Vec<SharedAssertion>);

impl fmt::Debug for RequestAssertions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestAssertions").field(&self.0.len()).finish()
    }
}

/// Action candidates for a request, tried in order
pub type ActionExtractor = Arc<dyn Fn(&RequestInfo) -> Vec<String> + Send + Sync>;

/// Free list of reusable [`Target`]s
pub struct TargetPool {
    free: Mutex<Vec<Target>>,
    max_idle: usize,
}

impl TargetPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Borrow a cleared target; it returns to the pool when dropped
    pub fn get(&self) -> PooledTarget<'_> {
        let target = self.free.lock().pop().unwrap_or_default();
        PooledTarget { pool: self, target }
    }

    /// Number of idle targets
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, mut target: Target) {
        target.reset();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(target);
        }
    }
}

impl Default for TargetPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TargetPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Target checked out of a [`TargetPool`]
pub struct PooledTarget<'a> {
    pool: &'a TargetPool,
    target: Target,
}

impl Deref for PooledTarget<'_> {
    type Target = Target;

    fn deref(&self) -> &Target {
        &self.target
    }
}

impl DerefMut for PooledTarget<'_> {
    fn deref_mut(&mut self) -> &mut Target {
        &mut self.target
    }
}

impl Drop for PooledTarget<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.target));
    }
}

/// Authorizes HTTP requests by trying each derived action
pub struct RequestAuthorizer<A> {
    authorizer: A,
    actions: ActionExtractor,
    pool: TargetPool,
}

impl<A: Authorizer> RequestAuthorizer<A> {
    pub fn new(authorizer: A) -> Self {
        Self {
            authorizer,
            actions: Arc::new(default_actions),
            pool: TargetPool::new(),
        }
    }

    /// Replace the action extractor
    pub fn with_actions<F>(mut self, actions: F) -> Self
    where
        F: Fn(&RequestInfo) -> Vec<String> + Send + Sync + 'static,
    {
        self.actions = Arc::new(actions);
        self
    }

    pub fn with_pool(mut self, pool: TargetPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn pool(&self) -> &TargetPool {
        &self.pool
    }

    /// Authorize `req`.
    ///
    /// The first allowed action wins. Otherwise the decision for the last
    /// action tried is returned, or a plain deny when there was none.
    pub fn authorize<B>(&self, ctx: &Context, req: &Request<B>) -> AuthDecision {
        let info = RequestInfo::from_request(req);
        let actions = (self.actions)(&info);
        let ctx = ctx.clone().with_request_info(info);

        let claims = req.extensions().get::<Claims>();
        let assertions = req
            .extensions()
            .get::<RequestAssertions>()
            .map(|a| a.0.clone())
            .unwrap_or_default();

        let mut target = self.pool.get();
        target.assertions = assertions;

        let mut last = AuthDecision::deny(RbacError::Deny);
        for action in actions {
            target.action = action;

            let decision = self.authorizer.authorize(&ctx, claims, Some(&*target));
            if decision.is_allowed() {
                debug!("Request allowed on action '{}'", target.action);
                return decision;
            }
            last = decision;
        }

        last
    }
}

impl<A> fmt::Debug for RequestAuthorizer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAuthorizer")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_default_actions() {
        let cases = [
            ("GET", "/api/users", "/api/users"),
            ("POST", "/api/posts", "/api/posts"),
            ("GET", "/", "/"),
            ("PUT", "/api/v1/users/123/posts/456", "/api/v1/users/123/posts/456"),
            ("GET", "/api/users?active=true&page=1", "/api/users"),
            ("GET", "http://example.com", "/"),
        ];

        for (method, uri, path) in cases {
            let info = RequestInfo::from_request(&request(method, uri));
            assert_eq!(
                default_actions(&info),
                vec![
                    "*".to_string(),
                    method.to_string(),
                    path.to_string(),
                    format!("{} {}", method, path),
                ],
                "uri {}",
                uri
            );
        }
    }

    #[test]
    fn test_request_info_fields() {
        let req = Request::builder()
            .method("GET")
            .uri("https://secure.example.com/api/users?active=true")
            .header("authorization", "Bearer token123")
            .body(Body::empty())
            .unwrap();

        let info = RequestInfo::from_request(&req);

        assert_eq!(info.method, Method::GET);
        assert_eq!(info.host.as_deref(), Some("secure.example.com"));
        assert_eq!(info.path(), "/api/users");
        assert_eq!(info.uri.query(), Some("active=true"));
        assert_eq!(info.headers.get("authorization").unwrap(), "Bearer token123");
        assert!(info.is_tls);
    }

    #[test]
    fn test_host_header_wins() {
        let req = Request::builder()
            .uri("/x")
            .header("host", "internal.local")
            .body(Body::empty())
            .unwrap();

        let info = RequestInfo::from_request(&req);
        assert_eq!(info.host.as_deref(), Some("internal.local"));
        assert!(!info.is_tls);
    }

    #[test]
    fn test_pooled_target_is_reset() {
        let pool = TargetPool::new();
        {
            let mut target = pool.get();
            target.action = "post.edit".to_string();
            target
                .metadata
                .insert("k".to_string(), serde_json::json!(1));
        }
        assert_eq!(pool.idle(), 1);

        let target = pool.get();
        assert!(target.action.is_empty());
        assert!(target.metadata.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pool_caps_idle_targets() {
        let pool = TargetPool::with_max_idle(1);
        let a = pool.get();
        let b = pool.get();
        drop(a);
        drop(b);

        assert_eq!(pool.idle(), 1);
    }
}

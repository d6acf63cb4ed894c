//! Per-call evaluation context handed to assertions

use crate::authorizer::RequestInfo;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Evaluation context.
///
/// The engine never inspects the context itself; it only passes it through to
/// assertions, which may read request data, caller-supplied values, or the
/// cancellation state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancellation: CancellationToken,
    request: Option<Arc<RequestInfo>>,
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Attach the transport request this evaluation belongs to
    pub fn with_request_info(mut self, info: RequestInfo) -> Self {
        self.request = Some(Arc::new(info));
        self
    }

    pub fn request_info(&self) -> Option<&RequestInfo> {
        self.request.as_deref()
    }

    /// Add a caller-defined value
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

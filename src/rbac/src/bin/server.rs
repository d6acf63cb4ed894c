//! # RBAC HTTP Server
//!
//! HTTP front end for the CretoAI RBAC engine.
//!
//! ## Endpoints
//!
//! - `POST /v1/check` - Grant check for a principal and an action
//! - `GET /v1/roles/:name` - Role introspection
//! - `GET /health` - Health check
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `RBAC_CONFIG` - Path to a JSON registry configuration (optional)
//! - `RUST_LOG` - Log level (default: info)

use anyhow::Context as _;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    serve, Router,
};
use cretoai_rbac::{
    Authorizer, Claims, Context, DefaultAuthorizer, ErrorKind, Principal, Rbac, RbacConfig,
    RbacError, Target,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state
#[derive(Clone)]
struct AppState {
    authorizer: DefaultAuthorizer,
    start_time: std::time::Instant,
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Application error type
#[derive(Debug)]
enum AppError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<RbacError> for AppError {
    fn from(err: RbacError) -> Self {
        if err.is(ErrorKind::RoleNotFound) {
            AppError::NotFound(err.to_string())
        } else {
            AppError::BadRequest(err.to_string())
        }
    }
}

/// Grant check request
#[derive(Debug, Deserialize)]
struct CheckRequest {
    principal: Principal,
    action: String,
    #[serde(default)]
    context: HashMap<String, serde_json::Value>,
}

/// Grant check response
#[derive(Debug, Serialize)]
struct CheckResponse {
    allowed: bool,
    decision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Role introspection response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleResponse {
    name: String,
    permissions: Vec<String>,
    effective_permissions: Vec<String>,
    parents: Vec<String>,
    children: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    version: String,
    roles: usize,
}

/// POST /v1/check - Check a grant
async fn check_authorization(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    if req.action.is_empty() {
        return Err(AppError::BadRequest("action cannot be empty".to_string()));
    }

    info!(
        "Authorization check: principal={}, action={}",
        req.principal.id, req.action
    );

    let ctx = req
        .context
        .into_iter()
        .fold(Context::new(), |ctx, (k, v)| ctx.with_value(k, v));
    let claims = Claims::new(req.principal);
    let target = Target::new(req.action);

    let decision = state
        .authorizer
        .authorize(&ctx, Some(&claims), Some(&target));

    info!("Authorization decision: {}", decision.decision);

    Ok(Json(CheckResponse {
        allowed: decision.is_allowed(),
        decision: decision.decision.to_string(),
        reason: decision.error.map(|e| e.to_string()),
    }))
}

/// GET /v1/roles/:name - Describe a role
async fn get_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = state.authorizer.rbac().role(&name)?;

    Ok(Json(RoleResponse {
        name: role.name().to_string(),
        permissions: role.permissions(false).into_iter().collect(),
        effective_permissions: role.permissions(true).into_iter().collect(),
        parents: role.parents().map(|r| r.name().to_string()).collect(),
        children: role.children().map(|r| r.name().to_string()).collect(),
    }))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: cretoai_rbac::VERSION.to_string(),
        roles: state.authorizer.rbac().len(),
    })
}

/// Create the HTTP router with all endpoints
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/check", post(check_authorization))
        .route("/v1/roles/:name", get(get_role))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}

/// Build the registry from `RBAC_CONFIG`, or start empty
fn load_registry() -> anyhow::Result<Rbac> {
    let Ok(path) = std::env::var("RBAC_CONFIG") else {
        warn!("RBAC_CONFIG not set, starting with an empty registry");
        return Ok(Rbac::new());
    };

    info!("Loading RBAC config from {}", path);
    let file = File::open(&path).with_context(|| format!("failed to open {}", path))?;
    let config = RbacConfig::from_json_reader(file)
        .with_context(|| format!("failed to parse {}", path))?;

    Rbac::with_config(&config).context("failed to apply RBAC config")
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CretoAI RBAC Server v{}", cretoai_rbac::VERSION);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let rbac = load_registry()?;
    info!("Registry ready with {} roles", rbac.len());

    let state = AppState {
        authorizer: DefaultAuthorizer::new(Arc::new(rbac)),
        start_time: std::time::Instant::now(),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

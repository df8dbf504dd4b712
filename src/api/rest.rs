//! REST API Handlers
//!
//! HTTP boundary of the registry. The caller identity is taken from the
//! `X-Caller` request header and passed to the registry untouched; all
//! authorization decisions are made by the registry itself.

use crate::domain::{NodeStatus, Principal};
use crate::error::{Error, Result};
use crate::registry::{GlobalStatsSnapshot, NodeRecord, NodeRegistry, RegistryMetrics, SnapshotFile};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequestParts, Json, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Header carrying the principal on whose behalf a request is made
pub const CALLER_HEADER: &str = "x-caller";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Node registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeRequest {
    /// Principal of the node to enroll
    pub node: String,
}

/// Status update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Node info response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoResponse {
    pub node: String,
    pub status: String,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl NodeInfoResponse {
    fn from_record(node: &Principal, record: NodeRecord) -> Self {
        Self {
            node: node.to_string(),
            status: record.status.into(),
            active: record.active,
            registered_at: record.registered_at,
            updated_at: record.updated_at,
            revoked_at: record.revoked_at,
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Wrapper turning crate errors into HTTP responses
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::ApiAuthentication => StatusCode::UNAUTHORIZED,
            Error::OwnerOnly { .. } | Error::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Revoked { .. } | Error::AlreadyRegistered { .. } => StatusCode::CONFLICT,
            Error::InvalidStatus { .. }
            | Error::InvalidPrincipal { .. }
            | Error::ApiValidation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }

        (
            status,
            Json(ApiErrorResponse {
                error: self.0.kind().into(),
                message: self.0.to_string(),
                code: self.0.code(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Caller Extraction
// =============================================================================

/// Principal submitting the request
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError(Error::ApiAuthentication))?;

        Ok(Caller(Principal::parse(value)?))
    }
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    registry: Arc<NodeRegistry>,
    metrics: RegistryMetrics,
    store: Option<Arc<SnapshotFile>>,
    max_body_size: usize,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(registry: Arc<NodeRegistry>, metrics: RegistryMetrics) -> Self {
        Self {
            registry,
            metrics,
            store: None,
            max_body_size: 64 * 1024,
        }
    }

    /// Persist the registry to `store` after every successful mutation
    pub fn with_store(mut self, store: Arc<SnapshotFile>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        self.metrics.observe(&self.registry.stats());

        let state = AppState {
            registry: self.registry,
            metrics: self.metrics,
            store: self.store,
        };

        Router::new()
            // Node endpoints
            .route("/v1/nodes", post(register_node))
            .route("/v1/nodes/:node", get(get_node_info))
            .route("/v1/nodes/:node/status", put(update_node_status))
            .route("/v1/nodes/:node/revoke", post(revoke_node))
            // Observability
            .route("/v1/stats", get(get_stats))
            .route("/metrics", get(get_metrics))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(self.max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    registry: Arc<NodeRegistry>,
    metrics: RegistryMetrics,
    store: Option<Arc<SnapshotFile>>,
}

impl AppState {
    /// Count boundary refusals the same way the registry counts its own
    fn admit<T>(&self, operation: &str, input: Result<T>) -> Result<T> {
        input.map_err(|e| self.registry.note_rejection(operation, e))
    }

    fn record<T>(&self, operation: &str, result: &Result<T>) {
        self.metrics.record(operation, &result.as_ref().map(|_| ()));
        self.metrics.observe(&self.registry.stats());
    }

    /// Record metrics for a mutation and persist on success
    async fn complete<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        self.record(operation, &result);

        if result.is_ok() {
            if let Some(store) = &self.store {
                // In-memory state stays authoritative; the next save catches up
                if let Err(e) = store.save(&self.registry).await {
                    error!("Failed to persist registry to {}: {}", store.path().display(), e);
                }
            }
        }

        result
    }
}

fn caller_principal(extracted: std::result::Result<Caller, ApiError>) -> Result<Principal> {
    extracted.map(|Caller(caller)| caller).map_err(|ApiError(e)| e)
}

fn json_body<T>(extracted: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    extracted
        .map(|Json(body)| body)
        .map_err(|e| Error::ApiValidation(e.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a node (owner only)
async fn register_node(
    State(state): State<AppState>,
    caller: std::result::Result<Caller, ApiError>,
    request: std::result::Result<Json<RegisterNodeRequest>, JsonRejection>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let input = caller_principal(caller)
        .and_then(|caller| Ok((caller, Principal::parse(json_body(request)?.node)?)));
    let result = state
        .admit("register", input)
        .and_then(|(caller, node)| state.registry.register(&caller, node.clone()).map(|()| node));
    let node = state.complete("register", result).await?;

    let record = state
        .registry
        .get_info(&node)
        .ok_or_else(|| Error::Internal(format!("node {} missing after registration", node)))?;
    Ok((
        StatusCode::CREATED,
        Json(NodeInfoResponse::from_record(&node, record)),
    ))
}

/// Update a node's own status
async fn update_node_status(
    State(state): State<AppState>,
    caller: std::result::Result<Caller, ApiError>,
    Path(node): Path<String>,
    request: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> std::result::Result<StatusCode, ApiError> {
    let input = caller_principal(caller).and_then(|caller| {
        let node = Principal::parse(node)?;
        let status = NodeStatus::parse(json_body(request)?.status)?;
        Ok((caller, node, status))
    });
    let result = state
        .admit("update_status", input)
        .and_then(|(caller, node, status)| state.registry.update_status(&caller, &node, status));
    state.complete("update_status", result).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke a node (owner only)
async fn revoke_node(
    State(state): State<AppState>,
    caller: std::result::Result<Caller, ApiError>,
    Path(node): Path<String>,
) -> std::result::Result<StatusCode, ApiError> {
    let input = caller_principal(caller)
        .and_then(|caller| Ok((caller, Principal::parse(node)?)));
    let result = state
        .admit("revoke", input)
        .and_then(|(caller, node)| state.registry.revoke(&caller, &node));
    state.complete("revoke", result).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get node info. Reads need no caller identity.
async fn get_node_info(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> std::result::Result<Json<NodeInfoResponse>, ApiError> {
    let result = state
        .admit("get_info", Principal::parse(node))
        .and_then(|node| match state.registry.get_info(&node) {
            Some(record) => Ok(NodeInfoResponse::from_record(&node, record)),
            None => Err(Error::NotFound {
                node: node.to_string(),
            }),
        });
    state.record("get_info", &result);
    Ok(Json(result?))
}

/// Get registry statistics
async fn get_stats(State(state): State<AppState>) -> Json<GlobalStatsSnapshot> {
    Json(state.registry.stats())
}

/// Prometheus scrape endpoint
async fn get_metrics(State(state): State<AppState>) -> std::result::Result<Response, ApiError> {
    state.metrics.observe(&state.registry.stats());
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

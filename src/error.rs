//! Gateway error taxonomy and HTTP mapping.
//!
//! Component-level errors are lifted into [`GatewayError`] at the HTTP edge,
//! where each kind maps to a status code: bad request 400, not found 404,
//! conflict 409, upstream 502, internal 500.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::ports::store::StoreError;

/// Error returned by gateway components to the HTTP edge.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The caller sent something the gateway cannot act on.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A service, route, or prefix match does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The upstream backend is unavailable or returned something invalid.
    #[error("upstream: {0}")]
    Upstream(String),

    /// Everything else: database failures, marshalling failures.
    #[error("internal: {0}")]
    Internal(String),
}

impl GatewayError {
    /// The HTTP status this error maps to at the public and admin edges.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => GatewayError::NotFound("not found".to_string()),
            StoreError::Conflict(msg) => GatewayError::Conflict(msg),
            StoreError::Backend(msg) => GatewayError::Internal(msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

//! Bearer-token validation for the admin surface.
//!
//! When `JWT_SECRET` is unset the middleware passes everything through so
//! local development works without minting tokens.
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    #[allow(dead_code)]
    #[serde(default)]
    sub: String,
    #[allow(dead_code)]
    #[serde(default)]
    exp: u64,
}

/// Validate the `Authorization: Bearer` header as an HS256 JWT.
pub async fn require_bearer(
    secret: std::sync::Arc<String>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if secret.is_empty() {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    match jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(_) => next.run(req).await,
        Err(e) => {
            tracing::debug!(error = %e, "bearer validation failed");
            unauthorized("invalid bearer token")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

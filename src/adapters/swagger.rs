//! Onboarding validator: fetch and validate a backend's OpenAPI document.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use http_body_util::BodyExt;
use hyper::Request;

use crate::{error::GatewayError, ports::http_client::HttpClient};

/// Fetch `swagger_url`, require a 2xx response, validate the body as an
/// OpenAPI 3 document, and return the raw JSON for persistence together with
/// the base URL inferred from `servers[0].url` (trailing `/` trimmed, empty
/// when not derivable).
pub async fn fetch_and_validate(
    http: &Arc<dyn HttpClient>,
    swagger_url: &str,
) -> Result<(serde_json::Value, String), GatewayError> {
    let req = Request::builder()
        .method("GET")
        .uri(swagger_url)
        .body(AxumBody::empty())
        .map_err(|e| GatewayError::BadRequest(format!("invalid swagger_url: {e}")))?;

    let response = http
        .send_request(req)
        .await
        .map_err(|e| GatewayError::Upstream(format!("swagger fetch failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Upstream(format!(
            "swagger fetch returned status {status}"
        )));
    }

    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::Upstream(format!("swagger body read failed: {e}")))?
        .to_bytes();

    let raw: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::Upstream(format!("swagger is not valid JSON: {e}")))?;

    // Structural OpenAPI 3 validation; the raw value is what gets persisted.
    serde_json::from_value::<oas3::OpenApiV3Spec>(raw.clone())
        .map_err(|e| GatewayError::Upstream(format!("invalid OpenAPI document: {e}")))?;

    let base = infer_base_url(&raw);
    Ok((raw, base))
}

/// Pull `servers[0].url` out of a raw OpenAPI document, trimming any trailing
/// `/`. Returns an empty string when the document has no usable server entry.
pub fn infer_base_url(doc: &serde_json::Value) -> String {
    doc.get("servers")
        .and_then(|servers| servers.as_array())
        .and_then(|servers| servers.first())
        .and_then(|first| first.get("url"))
        .and_then(|url| url.as_str())
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_infer_base_url() {
        let doc = json!({
            "openapi": "3.0.3",
            "servers": [{"url": "http://u:8081/api/"}, {"url": "http://other"}]
        });
        assert_eq!(infer_base_url(&doc), "http://u:8081/api");
    }

    #[test]
    fn test_infer_base_url_missing() {
        assert_eq!(infer_base_url(&json!({"openapi": "3.0.3"})), "");
        assert_eq!(infer_base_url(&json!({"servers": []})), "");
        assert_eq!(infer_base_url(&json!({"servers": [{"no_url": 1}]})), "");
    }
}

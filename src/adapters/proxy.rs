//! Reverse-proxy director for HTTP backends.
//!
//! Rewrites a matched public request onto the backend origin: scheme and
//! authority come from the service's `base_url`, the path is the base path
//! (trailing `/` trimmed) joined with the remainder, the query is carried
//! over verbatim, and the Host header is pinned to the upstream authority.
//! All other headers, including `Authorization`, pass through unchanged.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use hyper::{Request, Response, Uri, header::HeaderValue};

use crate::{core::model::Service, error::GatewayError, ports::http_client::HttpClient};

/// Proxy `req` to `service`'s origin under the stripped `remainder` path.
pub async fn forward(
    http: &Arc<dyn HttpClient>,
    service: &Service,
    remainder: &str,
    mut req: Request<AxumBody>,
) -> Result<Response<AxumBody>, GatewayError> {
    let upstream = rewrite_uri(&service.base_url, remainder, req.uri().query())?;

    let host = upstream
        .authority()
        .map(|a| a.to_string())
        .unwrap_or_default();

    *req.uri_mut() = upstream;
    if let Ok(value) = HeaderValue::from_str(&host) {
        req.headers_mut().insert(hyper::header::HOST, value);
    }

    http.send_request(req)
        .await
        .map_err(|e| GatewayError::Upstream(format!("backend request failed: {e}")))
}

/// Build the upstream URI for a base origin, remainder and optional query.
pub fn rewrite_uri(
    base_url: &str,
    remainder: &str,
    query: Option<&str>,
) -> Result<Uri, GatewayError> {
    let base: Uri = base_url
        .parse()
        .map_err(|_| GatewayError::Upstream(format!("bad upstream base_url: {base_url}")))?;
    let (Some(scheme), Some(authority)) = (base.scheme_str(), base.authority()) else {
        return Err(GatewayError::Upstream(format!(
            "upstream base_url is not absolute: {base_url}"
        )));
    };

    let base_path = base.path().trim_end_matches('/');
    let path = format!("{base_path}{remainder}");
    let path_and_query = match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path,
    };

    Uri::builder()
        .scheme(scheme)
        .authority(authority.as_str())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| GatewayError::Upstream(format!("bad upstream uri: {e}")))
}

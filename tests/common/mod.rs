//! Shared fixtures for integration tests: an in-memory store wired into the
//! full router, plus a scriptable HTTP client standing in for backends.
#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use hyper::{Request, Response, StatusCode, header};
use portico::{
    Gateway, MemoryStore,
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};

/// Records outbound requests and answers them with a canned response.
pub struct ScriptedHttpClient {
    pub status: StatusCode,
    pub body: String,
    pub seen: Mutex<Vec<SeenRequest>>,
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub uri: String,
    pub host: Option<String>,
    pub authorization: Option<String>,
}

impl ScriptedHttpClient {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Client answering with a minimal valid OpenAPI 3 document.
    pub fn openapi(server_url: &str) -> Self {
        let doc = serde_json::json!({
            "openapi": "3.0.3",
            "info": { "title": "Fixture API", "version": "1.0.0" },
            "servers": [{ "url": server_url }],
            "paths": {}
        });
        Self::new(StatusCode::OK, doc.to_string())
    }

    pub fn last_seen(&self) -> Option<SeenRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn send_request(&self, req: Request<Body>) -> HttpClientResult<Response<Body>> {
        let header_str = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        self.seen.lock().unwrap().push(SeenRequest {
            method: req.method().to_string(),
            uri: req.uri().to_string(),
            host: header_str(header::HOST),
            authorization: header_str(header::AUTHORIZATION),
        });

        Response::builder()
            .status(self.status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(self.body.clone()))
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))
    }

    async fn health_check(&self, _url: &str, _timeout_secs: u64) -> HttpClientResult<bool> {
        Ok(self.status.is_success())
    }
}

/// Gateway over a fresh in-memory store and the given scripted client.
pub fn test_gateway(client: Arc<ScriptedHttpClient>) -> Gateway {
    Gateway::new(Arc::new(MemoryStore::new()), client)
}

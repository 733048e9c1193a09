//! Domain model for the service registry.
//!
//! A [`Service`] is one onboarded backend, reachable under its unique
//! `public_prefix`. A [`Route`] maps a templated REST path under that prefix
//! onto a fully-qualified gRPC method for transcoding.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the gateway talks to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Protocol {
    /// Plain reverse proxy to `base_url`.
    #[default]
    #[serde(rename = "http")]
    Http,
    /// JSON-to-gRPC transcoding against `grpc_target`.
    #[serde(rename = "grpc-json")]
    GrpcJson,
}

impl Protocol {
    /// Parse the wire form, accepting any case. Unknown values are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "http" => Some(Protocol::Http),
            "grpc-json" => Some(Protocol::GrpcJson),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::GrpcJson => "grpc-json",
        }
    }
}

/// Outcome of the most recent health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "Healthy",
            HealthState::Unhealthy => "Unhealthy",
        }
    }

    /// Parse the persisted form; empty or unknown text means "never probed".
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Healthy" => Some(HealthState::Healthy),
            "Unhealthy" => Some(HealthState::Unhealthy),
            _ => None,
        }
    }
}

/// A backend service managed by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Path prefix the service is mounted under; canonical `/…/` form.
    #[serde(default)]
    pub public_prefix: String,
    /// Origin root, no trailing slash.
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub swagger_url: String,
    #[serde(default)]
    pub protocol: Protocol,
    /// host:port of the gRPC server; required when protocol is `grpc-json`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub grpc_target: String,
    #[serde(default)]
    pub enabled: bool,
    /// Cached OpenAPI document, persisted verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger_json: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_health_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<HealthState>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// One entry of a route's query mapping: query key -> RPC field with a type
/// hint (`string`, `int`, `float`, `bool`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMapEntry {
    pub field: String,
    #[serde(default)]
    pub r#type: String,
}

pub type QueryMapping = HashMap<String, QueryMapEntry>;

/// Maps an incoming REST method+path (under a service's public prefix) to a
/// gRPC full method name (`package.Service/Method`) for transcoding.
///
/// The path may contain template params like `{id}` or `{id:int}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub service_id: String,
    /// Upper-cased at persistence time.
    pub method: String,
    pub path: String,
    pub grpc_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_mapping: Option<QueryMapping>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Canonicalise a public prefix to start and end with `/`. Idempotent.
pub fn normalize_prefix(prefix: &str) -> String {
    let mut p = prefix.to_string();
    if !p.starts_with('/') {
        p.insert(0, '/');
    }
    if !p.ends_with('/') {
        p.push('/');
    }
    p
}

/// Derive a fallback service name from a base URL (its hostname), or echo
/// the input when it does not parse.
pub fn guess_name_from_url(base: &str) -> String {
    if base.starts_with("http") {
        if let Ok(uri) = base.parse::<hyper::Uri>() {
            if let Some(host) = uri.host() {
                return host.to_string();
            }
        }
    }
    base.to_string()
}

//! Request payloads for the admin surface.
use serde::{Deserialize, Serialize};

use crate::core::model::QueryMapping;

/// Payload to onboard a backend service.
#[derive(Debug, Default, Deserialize)]
pub struct CreateServiceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public_prefix: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub swagger_url: String,
    /// "http" (default) uses the reverse proxy; "grpc-json" enables
    /// JSON-to-gRPC transcoding.
    #[serde(default)]
    pub protocol: String,
    /// Required when protocol is "grpc-json" (format host:port).
    #[serde(default)]
    pub grpc_target: String,
    pub enabled: Option<bool>,
}

/// Payload to create a route mapping under a service.
#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub grpc_method: String,
    #[serde(default)]
    pub query_mapping: Option<QueryMapping>,
}

/// One gRPC method found via reflection discovery.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveredMethod {
    pub service: String,
    pub method: String,
    pub grpc_method: String,
}

//! Admin handlers: JSON in, JSON out over the registry store.
//!
//! Every mutation is followed by a best-effort runtime index reload; the
//! mutation itself is durable once the store call returns.
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    admin::{
        discover,
        types::{CreateRouteRequest, CreateServiceRequest},
    },
    adapters::swagger,
    core::model::{Protocol, Route, Service, guess_name_from_url, normalize_prefix},
    error::GatewayError,
    state::Gateway,
};

pub async fn list_services(
    State(gateway): State<Gateway>,
) -> Result<Json<Vec<Service>>, GatewayError> {
    let list = gateway.store.list().await?;
    Ok(Json(list))
}

pub async fn create_service(
    State(gateway): State<Gateway>,
    Json(body): Json<CreateServiceRequest>,
) -> Result<Json<Service>, GatewayError> {
    if body.public_prefix.is_empty() {
        return Err(GatewayError::BadRequest("public_prefix required".to_string()));
    }
    let protocol = Protocol::parse(&body.protocol)
        .ok_or_else(|| GatewayError::BadRequest(format!("unsupported protocol: {}", body.protocol)))?;

    let mut base = body.base_url.trim().to_string();
    let mut swagger_json = None;
    match protocol {
        Protocol::Http => {
            if body.swagger_url.is_empty() {
                return Err(GatewayError::BadRequest(
                    "swagger_url required for protocol=http".to_string(),
                ));
            }
            let (raw, inferred) =
                swagger::fetch_and_validate(&gateway.http, &body.swagger_url).await?;
            swagger_json = Some(raw);
            if base.is_empty() {
                base = inferred;
            }
            if base.is_empty() {
                return Err(GatewayError::BadRequest(
                    "base_url missing and not derivable from swagger servers".to_string(),
                ));
            }
        }
        Protocol::GrpcJson => {
            if body.grpc_target.trim().is_empty() {
                return Err(GatewayError::BadRequest(
                    "grpc_target required for protocol=grpc-json".to_string(),
                ));
            }
        }
    }

    let now = Utc::now();
    let service = Service {
        id: Uuid::new_v4().to_string(),
        name: if body.name.is_empty() {
            guess_name_from_url(&base)
        } else {
            body.name
        },
        description: body.description,
        public_prefix: normalize_prefix(&body.public_prefix),
        base_url: base.trim_end_matches('/').to_string(),
        swagger_url: body.swagger_url,
        protocol,
        grpc_target: body.grpc_target.trim().to_string(),
        enabled: body.enabled.unwrap_or(true),
        swagger_json,
        last_refreshed_at: match protocol {
            Protocol::Http => Some(now),
            Protocol::GrpcJson => None,
        },
        last_health_at: None,
        last_status: None,
        created_at: now,
        updated_at: now,
    };

    gateway.store.create(&service).await?;
    gateway.reload_index_logged().await;
    Ok(Json(service))
}

pub async fn get_service(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Json<Service>, GatewayError> {
    let service = gateway.store.get(&id).await?;
    Ok(Json(service))
}

pub async fn update_service(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
    Json(mut body): Json<Service>,
) -> Result<Json<Service>, GatewayError> {
    body.id = id;
    body.public_prefix = normalize_prefix(&body.public_prefix);
    gateway.store.update(&body).await?;
    gateway.reload_index_logged().await;
    Ok(Json(body))
}

pub async fn delete_service(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    gateway.store.delete(&id).await?;
    gateway.reload_index_logged().await;
    Ok(Json(json!({ "deleted": id })))
}

/// Re-fetch and validate the service's swagger document.
pub async fn refresh_service(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Json<Service>, GatewayError> {
    let mut service = gateway.store.get(&id).await?;
    if service.protocol == Protocol::GrpcJson {
        return Err(GatewayError::BadRequest(
            "refresh not supported for protocol=grpc-json".to_string(),
        ));
    }

    let (raw, inferred) = swagger::fetch_and_validate(&gateway.http, &service.swagger_url).await?;
    if service.base_url.is_empty() && !inferred.is_empty() {
        service.base_url = inferred;
    }
    service.swagger_json = Some(raw);
    service.last_refreshed_at = Some(Utc::now());

    gateway.store.update(&service).await?;
    gateway.reload_index_logged().await;
    Ok(Json(service))
}

pub async fn list_routes(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Route>>, GatewayError> {
    let routes = gateway.store.list_routes(&id).await?;
    Ok(Json(routes))
}

pub async fn create_route(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
    Json(body): Json<CreateRouteRequest>,
) -> Result<Json<Route>, GatewayError> {
    if body.method.is_empty() || body.path.is_empty() || body.grpc_method.is_empty() {
        return Err(GatewayError::BadRequest(
            "method, path, grpc_method required".to_string(),
        ));
    }
    let now = Utc::now();
    let route = Route {
        id: Uuid::new_v4().to_string(),
        service_id: id,
        method: body.method.to_ascii_uppercase(),
        path: body.path,
        grpc_method: body.grpc_method,
        query_mapping: body.query_mapping.filter(|m| !m.is_empty()),
        created_at: now,
        updated_at: now,
    };
    gateway.store.create_route(&route).await?;
    Ok(Json(route))
}

pub async fn get_route(
    State(gateway): State<Gateway>,
    Path((id, rid)): Path<(String, String)>,
) -> Result<Json<Route>, GatewayError> {
    let route = gateway.store.get_route(&id, &rid).await?;
    Ok(Json(route))
}

pub async fn update_route(
    State(gateway): State<Gateway>,
    Path((id, rid)): Path<(String, String)>,
    Json(mut body): Json<Route>,
) -> Result<Json<Route>, GatewayError> {
    body.id = rid;
    body.service_id = id;
    body.method = body.method.to_ascii_uppercase();
    body.updated_at = Utc::now();
    gateway.store.update_route(&body).await?;
    Ok(Json(body))
}

pub async fn delete_route(
    State(gateway): State<Gateway>,
    Path((id, rid)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    gateway.store.delete_route(&id, &rid).await?;
    Ok(Json(json!({ "deleted": rid })))
}

/// List the gRPC methods a grpc-json service advertises via reflection.
pub async fn discover_routes(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Json<Vec<crate::admin::types::DiscoveredMethod>>, GatewayError> {
    let service = gateway.store.get(&id).await?;
    require_grpc(&service)?;
    let methods = discover::discover_methods(&service.grpc_target).await?;
    Ok(Json(methods))
}

/// Create REST routes for every discovered method using the default
/// heuristic, skipping `(method, path)` pairs that already exist.
pub async fn bulk_add_discovered_routes(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let service = gateway.store.get(&id).await?;
    require_grpc(&service)?;
    let methods = discover::discover_methods(&service.grpc_target).await?;

    let existing = gateway.store.list_routes(&id).await.unwrap_or_default();
    let taken: std::collections::HashSet<String> = existing
        .iter()
        .map(|r| format!("{} {}", r.method.to_ascii_uppercase(), r.path))
        .collect();

    let mut created = 0;
    for discovered in methods {
        let method = discover::http_method_for(&discovered.method);
        let path = discover::default_path(&discovered.method);
        if taken.contains(&format!("{method} {path}")) {
            continue;
        }
        let now = Utc::now();
        let route = Route {
            id: Uuid::new_v4().to_string(),
            service_id: id.clone(),
            method: method.to_string(),
            path,
            grpc_method: discovered.grpc_method,
            query_mapping: None,
            created_at: now,
            updated_at: now,
        };
        if gateway.store.create_route(&route).await.is_ok() {
            created += 1;
        }
    }
    Ok(Json(json!({ "created": created })))
}

fn require_grpc(service: &Service) -> Result<(), GatewayError> {
    if service.protocol != Protocol::GrpcJson || service.grpc_target.is_empty() {
        return Err(GatewayError::BadRequest(
            "service is not grpc-json or grpc_target missing".to_string(),
        ));
    }
    Ok(())
}

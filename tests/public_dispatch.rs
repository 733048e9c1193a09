mod common;

use std::sync::Arc;

use axum::body::Body;
use hyper::{Request, StatusCode, header};
use portico::app_router;
use serde_json::json;
use tower::ServiceExt;

use common::ScriptedHttpClient;

async fn onboard(
    app: &axum::Router,
    payload: serde_json::Value,
) -> serde_json::Value {
    use http_body_util::BodyExt;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/services")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn proxied_request_is_rewritten_onto_backend_origin() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081/api"));
    let app = app_router(common::test_gateway(client.clone()), String::new());

    onboard(
        &app,
        json!({
            "public_prefix": "/api/users/",
            "base_url": "http://u:8081/api",
            "swagger_url": "http://u:8081/swagger.json"
        }),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/42")
                .header(header::AUTHORIZATION, "Bearer token-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = client.last_seen().unwrap();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.uri, "http://u:8081/api/42");
    assert_eq!(seen.host.as_deref(), Some("u:8081"));
    assert_eq!(seen.authorization.as_deref(), Some("Bearer token-123"));
}

#[tokio::test]
async fn longest_prefix_wins_between_overlapping_services() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client.clone()), String::new());

    onboard(
        &app,
        json!({
            "public_prefix": "/api/",
            "base_url": "http://generic:8000",
            "swagger_url": "http://u:8081/swagger.json"
        }),
    )
    .await;
    onboard(
        &app,
        json!({
            "public_prefix": "/api/users/",
            "base_url": "http://users:8001",
            "swagger_url": "http://u:8081/swagger.json"
        }),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(client.last_seen().unwrap().uri, "http://users:8001/7");
}

#[tokio::test]
async fn unmatched_prefix_is_not_found() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nothing/here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabling_a_service_unmounts_it_after_reload() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let mut service = onboard(
        &app,
        json!({
            "public_prefix": "/api/users/",
            "base_url": "http://u:8081",
            "swagger_url": "http://u:8081/swagger.json"
        }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let id = service["id"].as_str().unwrap().to_string();
    service["enabled"] = json!(false);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/admin/services/{id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(service.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn grpc_service_without_target_is_bad_gateway() {
    // Bypass the admin validation by writing straight to the store; a row
    // like this can exist after a partial manual edit.
    use chrono::Utc;
    use portico::core::model::{Protocol, Service};
    use portico::ports::store::ServiceStore;

    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let gateway = common::test_gateway(client);
    gateway
        .store
        .create(&Service {
            id: "s1".into(),
            name: "catalog".into(),
            description: String::new(),
            public_prefix: "/api/catalog/".into(),
            base_url: String::new(),
            swagger_url: String::new(),
            protocol: Protocol::GrpcJson,
            grpc_target: String::new(),
            enabled: true,
            swagger_json: None,
            last_refreshed_at: None,
            last_health_at: None,
            last_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();
    gateway.reload_index().await.unwrap();

    let app = app_router(gateway, String::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/catalog/ecomm.catalog.CatalogService/ListProducts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

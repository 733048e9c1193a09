mod common;

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode, header};
use portico::app_router;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::ScriptedHttpClient;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn create_http_service_fetches_swagger_and_normalizes_prefix() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081/api/"));
    let app = app_router(common::test_gateway(client.clone()), String::new());

    let response = app
        .oneshot(post_json(
            "/admin/services",
            json!({
                "name": "User Service",
                "public_prefix": "api/users",
                "swagger_url": "http://u:8081/swagger.json"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let service = body_json(response).await;
    assert_eq!(service["public_prefix"], "/api/users/");
    // base_url inferred from servers[0].url, trailing slash trimmed
    assert_eq!(service["base_url"], "http://u:8081/api");
    assert_eq!(service["protocol"], "http");
    assert_eq!(service["enabled"], true);
    assert!(service["swagger_json"].is_object());

    let fetched = client.last_seen().unwrap();
    assert_eq!(fetched.uri, "http://u:8081/swagger.json");
}

#[tokio::test]
async fn create_service_requires_public_prefix() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let response = app
        .oneshot(post_json(
            "/admin/services",
            json!({ "swagger_url": "http://u:8081/swagger.json" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_http_service_requires_swagger_url() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let response = app
        .oneshot(post_json(
            "/admin/services",
            json!({ "public_prefix": "/api/users/" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_grpc_service_requires_target() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let response = app
        .clone()
        .oneshot(post_json(
            "/admin/services",
            json!({ "public_prefix": "/api/catalog/", "protocol": "grpc-json" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/admin/services",
            json!({
                "public_prefix": "/api/catalog/",
                "protocol": "grpc-json",
                "grpc_target": "catalog:9092"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let service = body_json(response).await;
    assert_eq!(service["protocol"], "grpc-json");
    assert_eq!(service["grpc_target"], "catalog:9092");
}

#[tokio::test]
async fn unsupported_protocol_rejected() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let response = app
        .oneshot(post_json(
            "/admin/services",
            json!({ "public_prefix": "/api/x/", "protocol": "thrift" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_prefix_conflicts() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let payload = json!({
        "public_prefix": "/api/users/",
        "protocol": "grpc-json",
        "grpc_target": "users:9090"
    });
    let response = app
        .clone()
        .oneshot(post_json("/admin/services", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/admin/services", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn swagger_fetch_failure_maps_to_bad_gateway() {
    let client = Arc::new(ScriptedHttpClient::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "boom",
    ));
    let app = app_router(common::test_gateway(client), String::new());

    let response = app
        .oneshot(post_json(
            "/admin/services",
            json!({
                "public_prefix": "/api/users/",
                "swagger_url": "http://u:8081/swagger.json"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn get_update_delete_service() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let created = body_json(
        app.clone()
            .oneshot(post_json(
                "/admin/services",
                json!({
                    "public_prefix": "/api/users/",
                    "protocol": "grpc-json",
                    "grpc_target": "users:9090"
                }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/admin/services/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // disable via PUT
    let mut updated = created.clone();
    updated["enabled"] = json!(false);
    let response = app
        .clone()
        .oneshot(put_json(&format!("/admin/services/{id}"), updated))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = app
        .clone()
        .oneshot(get(&format!("/admin/services/{id}")))
        .await
        .unwrap();
    assert_eq!(body_json(body).await["enabled"], false);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/admin/services/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], json!(id));

    let response = app
        .oneshot(get(&format!("/admin/services/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_rejected_for_grpc_service() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let created = body_json(
        app.clone()
            .oneshot(post_json(
                "/admin/services",
                json!({
                    "public_prefix": "/api/catalog/",
                    "protocol": "grpc-json",
                    "grpc_target": "catalog:9092"
                }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(post_json(&format!("/admin/services/{id}/refresh"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_crud_and_uniqueness() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), String::new());

    let created = body_json(
        app.clone()
            .oneshot(post_json(
                "/admin/services",
                json!({
                    "public_prefix": "/api/catalog/",
                    "protocol": "grpc-json",
                    "grpc_target": "catalog:9092"
                }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let route_payload = json!({
        "method": "get",
        "path": "/products/{id:int}",
        "grpc_method": "ecomm.catalog.CatalogService/GetProduct",
        "query_mapping": { "lang": { "field": "locale", "type": "string" } }
    });
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/admin/services/{id}/routes"),
            route_payload.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let route = body_json(response).await;
    assert_eq!(route["method"], "GET", "method upper-cased on persistence");
    let rid = route["id"].as_str().unwrap().to_string();

    // same (method, path) again conflicts
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/admin/services/{id}/routes"),
            route_payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // missing fields rejected
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/admin/services/{id}/routes"),
            json!({ "method": "GET" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get(&format!("/admin/services/{id}/routes/{rid}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/admin/services/{id}/routes/{rid}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/admin/services/{id}/routes/{rid}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_requires_bearer_when_secret_set() {
    let client = Arc::new(ScriptedHttpClient::openapi("http://u:8081"));
    let app = app_router(common::test_gateway(client), "super-secret".to_string());

    let response = app
        .clone()
        .oneshot(get("/admin/services"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // system endpoints stay open
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

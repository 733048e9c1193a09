//! System endpoints: liveness, readiness, and the gateway's own API docs.
use axum::{Json, Router, response::Html, routing::get};
use serde_json::json;

pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/swagger.json", get(swagger_json))
        .route("/swagger", get(swagger_ui))
        .route("/swagger/", get(swagger_ui))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readyz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ready" }))
}

/// Minimal OpenAPI 3 document for the gateway's own surface.
async fn swagger_json() -> Json<serde_json::Value> {
    Json(json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Portico API Gateway",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Gateway surface endpoints and health checks."
        },
        "paths": {
            "/healthz": {
                "get": {
                    "summary": "Liveness probe",
                    "responses": { "200": { "description": "OK" } }
                }
            },
            "/readyz": {
                "get": {
                    "summary": "Readiness probe",
                    "responses": { "200": { "description": "Ready" } }
                }
            }
        }
    }))
}

async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Swagger UI - Portico</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
  <style>body { margin: 0; }</style>
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = function () {
      window.ui = SwaggerUIBundle({
        url: '/swagger.json',
        dom_id: '#swagger-ui',
        validatorUrl: null,
        deepLinking: true,
        presets: [SwaggerUIBundle.presets.apis],
        layout: 'BaseLayout'
      });
    };
  </script>
</body>
</html>"#,
    )
}

//! Public dispatcher for the gateway.
//!
//! Every request under the public mount is matched against the runtime index
//! by longest prefix, then forwarded either through the reverse proxy (http
//! services) or the JSON-to-gRPC transcoder (grpc-json services).
use std::time::Instant;

use axum::{
    body::Body as AxumBody,
    http::{StatusCode, header},
};
use http_body_util::BodyExt;
use hyper::{Request, Response};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    adapters::proxy,
    core::{
        model::{Protocol, Service},
        route_match,
    },
    error::GatewayError,
    state::Gateway,
    tracing_setup,
    transcode::{self, TranscodeCall},
};

/// HTTP handler for public gateway traffic.
#[derive(Clone)]
pub struct HttpHandler {
    gateway: Gateway,
}

impl HttpHandler {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Main request handler: span + timing around the dispatch.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let start_time = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = Uuid::new_v4().to_string();

        let span = tracing_setup::create_request_span(method.as_str(), &path, &request_id);

        let result = async { self.dispatch(req).await }.instrument(span).await;

        let duration = start_time.elapsed();
        match result {
            Ok(response) => {
                tracing::info!(
                    status = response.status().as_u16(),
                    duration_ms = duration.as_millis() as u64,
                    "request completed"
                );
                response
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    tracing::error!(error = %e, duration_ms = duration.as_millis() as u64, "request failed");
                } else {
                    tracing::info!(status = status.as_u16(), error = %e, "request rejected");
                }
                error_response(status, &e)
            }
        }
    }

    async fn dispatch(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>, GatewayError> {
        let path = req.uri().path().to_string();

        let (service, remainder) = {
            let index = self.gateway.index.load();
            match index.match_path(&path) {
                Some((service, remainder)) => (service.clone(), remainder),
                None => {
                    return Err(GatewayError::NotFound(format!("no service mounted at {path}")));
                }
            }
        };

        if !service.enabled {
            return Err(GatewayError::NotFound(format!("no service mounted at {path}")));
        }

        tracing::Span::current().record("route.prefix", service.public_prefix.as_str());

        match service.protocol {
            Protocol::Http => proxy::forward(&self.gateway.http, &service, &remainder, req).await,
            Protocol::GrpcJson => self.transcode(&service, &remainder, req).await,
        }
    }

    async fn transcode(
        &self,
        service: &Service,
        remainder: &str,
        req: Request<AxumBody>,
    ) -> Result<Response<AxumBody>, GatewayError> {
        if service.grpc_target.is_empty() {
            return Err(GatewayError::Upstream("grpc target missing".to_string()));
        }

        let mut method_path = remainder.trim_start_matches('/').to_string();
        let mut params = transcode::Params::new();

        // A remainder that is not itself a gRPC method path goes through the
        // service's configured route mappings.
        if !(method_path.contains('.') && method_path.contains('/')) {
            match self.gateway.store.list_routes(&service.id).await {
                Ok(routes) => {
                    if let Some((route, mut captured)) =
                        route_match::select_route(&routes, req.method().as_str(), remainder)
                    {
                        route_match::merge_query_params(&mut captured, req.uri().query(), route);
                        method_path = route.grpc_method.trim_start_matches('/').to_string();
                        params = captured;
                    }
                }
                Err(e) => {
                    tracing::warn!(service = %service.id, error = %e, "route lookup failed");
                }
            }
        }

        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| GatewayError::BadRequest(format!("failed to read request body: {e}")))?
            .to_bytes();

        let reply = transcode::invoke_unary(TranscodeCall {
            target: service.grpc_target.clone(),
            method_path,
            params,
            body: body.to_vec(),
            authorization,
        })
        .await?;

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(reply))
            .map_err(|e| GatewayError::Internal(format!("failed to build response: {e}")))
    }
}

fn error_response(status: StatusCode, err: &GatewayError) -> Response<AxumBody> {
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(AxumBody::from(body))
        .unwrap_or_else(|_| Response::new(AxumBody::from("internal error")))
}

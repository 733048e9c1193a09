//! Portico - a dynamic API gateway with runtime service onboarding.
//!
//! Portico accepts HTTP traffic on a single public entrypoint and forwards
//! each request to one of a dynamically-managed set of backend services.
//! Backends are onboarded at runtime through an admin surface; each is
//! identified by a unique URL prefix and addressed either as an HTTP origin
//! (reverse-proxy mode) or as a gRPC server for which the gateway performs
//! JSON-to-gRPC transcoding using runtime server reflection.
//!
//! # Architecture
//! The crate follows a **hexagonal architecture**: business logic (the prefix
//! index, the templated route matcher, the data model) lives in `core` and is
//! I/O-free; persistence and outbound HTTP go through **ports** (traits in
//! `ports`) implemented by **adapters** (`adapters`). The Postgres store, the
//! in-memory store, and the Redis caching decorator all implement the same
//! [`ports::store::ServiceStore`] contract, so nothing above the port can
//! tell them apart.
//!
//! # Request flow
//! Public traffic hits the dispatcher ([`adapters::HttpHandler`]), which
//! matches the path against the [`core::RuntimeIndex`] by longest prefix and
//! branches on the service's protocol: `http` services go through the reverse
//! proxy director, `grpc-json` services through the [`transcode`] module,
//! optionally after consulting the service's templated route mappings.
//!
//! Admin mutations write to the store, invalidate the cache layer, and then
//! rebuild the runtime index from the enabled-only snapshot. The index holder
//! is an `ArcSwap`, so a rebuild is one atomic pointer swap and readers never
//! block.
//!
//! # Error Handling
//! Component errors are lifted into [`error::GatewayError`], which carries
//! the HTTP mapping (400/404/409/502/500). Application-level wiring returns
//! `eyre::Result` with context attached via `WrapErr`.
pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod migrate;
pub mod system;
pub mod tracing_setup;
pub mod transcode;
pub mod utils;

pub mod adapters;
pub mod core;
pub mod ports;
pub mod state;

use std::sync::Arc;

use axum::{Router, extract::Request, middleware};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use crate::{
    adapters::{HttpClientAdapter, HttpHandler, MemoryStore, PgStore},
    core::RuntimeIndex,
    state::Gateway,
};

/// Build the complete gateway router: system endpoints, the bearer-guarded
/// admin surface, and the public catch-all dispatcher.
pub fn app_router(gateway: Gateway, jwt_secret: String) -> Router {
    let secret = Arc::new(jwt_secret);
    let admin = admin::router(gateway.clone()).layer(middleware::from_fn(
        move |req: Request, next: middleware::Next| {
            let secret = secret.clone();
            async move { auth::require_bearer(secret, req, next).await }
        },
    ));

    let handler = HttpHandler::new(gateway);

    Router::new()
        .merge(system::router())
        .merge(admin)
        .fallback(move |req: Request| {
            let handler = handler.clone();
            async move { handler.handle_request(req).await }
        })
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

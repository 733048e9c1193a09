//! Admin surface: service and route management over the registry.
pub mod discover;
pub mod handlers;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::Gateway;

/// Build the `/admin` router. Bearer auth is layered on by the caller.
pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route(
            "/admin/services",
            get(handlers::list_services).post(handlers::create_service),
        )
        .route(
            "/admin/services/{id}",
            get(handlers::get_service)
                .put(handlers::update_service)
                .delete(handlers::delete_service),
        )
        .route("/admin/services/{id}/refresh", post(handlers::refresh_service))
        .route(
            "/admin/services/{id}/routes",
            get(handlers::list_routes).post(handlers::create_route),
        )
        .route(
            "/admin/services/{id}/routes/discover",
            get(handlers::discover_routes),
        )
        .route(
            "/admin/services/{id}/routes/discover/bulk",
            post(handlers::bulk_add_discovered_routes),
        )
        .route(
            "/admin/services/{id}/routes/{rid}",
            get(handlers::get_route)
                .put(handlers::update_route)
                .patch(handlers::update_route)
                .delete(handlers::delete_route),
        )
        .with_state(gateway)
}

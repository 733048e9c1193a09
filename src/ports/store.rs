//! Persistence port for the service registry.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::model::{HealthState, Route, Service};

/// Errors surfaced by a registry store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// The requested service or route does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated (`public_prefix`, or the
    /// `(service_id, method, path_pattern)` triple).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// ServiceStore abstracts persistence for services and their routes.
///
/// Three implementations share this contract: the durable Postgres store, the
/// in-memory store used by tests and local development, and the caching
/// decorator composing another store. Callers must not depend on which one
/// they hold.
#[async_trait]
pub trait ServiceStore: Send + Sync + 'static {
    /// Create the schema and tables if missing. Idempotent.
    async fn init(&self) -> StoreResult<()>;

    /// Read the enabled-only snapshot the runtime index is rebuilt from.
    async fn load_enabled(&self) -> StoreResult<Vec<Service>>;

    async fn list(&self) -> StoreResult<Vec<Service>>;
    async fn get(&self, id: &str) -> StoreResult<Service>;
    async fn create(&self, service: &Service) -> StoreResult<()>;
    async fn update(&self, service: &Service) -> StoreResult<()>;
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Write only the health fields of a service, leaving everything else
    /// untouched. Used by the prober so its writes cannot clobber concurrent
    /// admin updates.
    async fn update_status(
        &self,
        id: &str,
        status: HealthState,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn list_routes(&self, service_id: &str) -> StoreResult<Vec<Route>>;
    async fn get_route(&self, service_id: &str, route_id: &str) -> StoreResult<Route>;
    async fn create_route(&self, route: &Route) -> StoreResult<()>;
    async fn update_route(&self, route: &Route) -> StoreResult<()>;
    async fn delete_route(&self, service_id: &str, route_id: &str) -> StoreResult<()>;

    /// Look up a route by its exact `(service, method, path_pattern)` triple.
    async fn find_route(&self, service_id: &str, method: &str, path: &str) -> StoreResult<Route>;
}

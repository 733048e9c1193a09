//! Read-through cache decorator over a [`ServiceStore`].
//!
//! Keys:
//!   - `gateway:services:enabled` -> JSON array of services (load_enabled)
//!   - `gateway:services:list`    -> JSON array of services (list)
//!   - `gateway:service:<id>`     -> JSON object (get)
//!
//! Mutations invalidate all three families after the inner store succeeds.
//! Route operations pass through uncached. Every cache failure degrades to
//! pass-through; the decorator never fails an operation the inner store
//! completed.
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    core::model::{HealthState, Route, Service},
    ports::store::{ServiceStore, StoreResult},
};

const KEY_ENABLED: &str = "gateway:services:enabled";
const KEY_LIST: &str = "gateway:services:list";
const KEY_SERVICE_PREFIX: &str = "gateway:service:";

const DEFAULT_TTL: Duration = Duration::from_secs(15);

/// Caching [`ServiceStore`] decorator backed by Redis.
pub struct CachingStore<S> {
    inner: S,
    redis: ConnectionManager,
    ttl: Duration,
}

impl<S: ServiceStore> CachingStore<S> {
    /// Wrap `inner`, caching reads in Redis with the given TTL (values at or
    /// below zero fall back to the 15 s default).
    pub fn new(inner: S, redis: ConnectionManager, ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
        Self { inner, redis, ttl }
    }

    /// Open a connection manager for `addr` (`host:port` or full redis URL).
    pub async fn open(addr: &str) -> eyre::Result<ConnectionManager> {
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{addr}")
        };
        let client = redis::Client::open(url)?;
        Ok(client.get_connection_manager().await?)
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(key, error = %e, "cache read failed, falling through");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(raw) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = self.redis.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, raw, self.ttl.as_secs())
            .await
        {
            tracing::debug!(key, error = %e, "cache write failed");
        }
    }

    async fn invalidate(&self, id: &str) {
        let mut conn = self.redis.clone();
        let mut keys = vec![KEY_ENABLED.to_string(), KEY_LIST.to_string()];
        if !id.is_empty() {
            keys.push(format!("{KEY_SERVICE_PREFIX}{id}"));
        }
        if let Err(e) = conn.del::<_, ()>(keys).await {
            tracing::warn!(error = %e, "cache invalidation failed");
        }
    }
}

#[async_trait]
impl<S: ServiceStore> ServiceStore for CachingStore<S> {
    async fn init(&self) -> StoreResult<()> {
        self.inner.init().await
    }

    async fn load_enabled(&self) -> StoreResult<Vec<Service>> {
        if let Some(list) = self.cached::<Vec<Service>>(KEY_ENABLED).await {
            return Ok(list);
        }
        let list = self.inner.load_enabled().await?;
        self.populate(KEY_ENABLED, &list).await;
        Ok(list)
    }

    async fn list(&self) -> StoreResult<Vec<Service>> {
        if let Some(list) = self.cached::<Vec<Service>>(KEY_LIST).await {
            return Ok(list);
        }
        let list = self.inner.list().await?;
        self.populate(KEY_LIST, &list).await;
        Ok(list)
    }

    async fn get(&self, id: &str) -> StoreResult<Service> {
        let key = format!("{KEY_SERVICE_PREFIX}{id}");
        if let Some(service) = self.cached::<Service>(&key).await {
            return Ok(service);
        }
        let service = self.inner.get(id).await?;
        self.populate(&key, &service).await;
        Ok(service)
    }

    async fn create(&self, service: &Service) -> StoreResult<()> {
        self.inner.create(service).await?;
        self.invalidate(&service.id).await;
        Ok(())
    }

    async fn update(&self, service: &Service) -> StoreResult<()> {
        self.inner.update(service).await?;
        self.invalidate(&service.id).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.inner.delete(id).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: HealthState,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.update_status(id, status, at).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn list_routes(&self, service_id: &str) -> StoreResult<Vec<Route>> {
        self.inner.list_routes(service_id).await
    }

    async fn get_route(&self, service_id: &str, route_id: &str) -> StoreResult<Route> {
        self.inner.get_route(service_id, route_id).await
    }

    async fn create_route(&self, route: &Route) -> StoreResult<()> {
        self.inner.create_route(route).await
    }

    async fn update_route(&self, route: &Route) -> StoreResult<()> {
        self.inner.update_route(route).await
    }

    async fn delete_route(&self, service_id: &str, route_id: &str) -> StoreResult<()> {
        self.inner.delete_route(service_id, route_id).await
    }

    async fn find_route(&self, service_id: &str, method: &str, path: &str) -> StoreResult<Route> {
        self.inner.find_route(service_id, method, path).await
    }
}

// Needed so an `Arc<dyn ServiceStore>` can itself be decorated.
#[async_trait]
impl ServiceStore for std::sync::Arc<dyn ServiceStore> {
    async fn init(&self) -> StoreResult<()> {
        self.as_ref().init().await
    }
    async fn load_enabled(&self) -> StoreResult<Vec<Service>> {
        self.as_ref().load_enabled().await
    }
    async fn list(&self) -> StoreResult<Vec<Service>> {
        self.as_ref().list().await
    }
    async fn get(&self, id: &str) -> StoreResult<Service> {
        self.as_ref().get(id).await
    }
    async fn create(&self, service: &Service) -> StoreResult<()> {
        self.as_ref().create(service).await
    }
    async fn update(&self, service: &Service) -> StoreResult<()> {
        self.as_ref().update(service).await
    }
    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.as_ref().delete(id).await
    }
    async fn update_status(
        &self,
        id: &str,
        status: HealthState,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.as_ref().update_status(id, status, at).await
    }
    async fn list_routes(&self, service_id: &str) -> StoreResult<Vec<Route>> {
        self.as_ref().list_routes(service_id).await
    }
    async fn get_route(&self, service_id: &str, route_id: &str) -> StoreResult<Route> {
        self.as_ref().get_route(service_id, route_id).await
    }
    async fn create_route(&self, route: &Route) -> StoreResult<()> {
        self.as_ref().create_route(route).await
    }
    async fn update_route(&self, route: &Route) -> StoreResult<()> {
        self.as_ref().update_route(route).await
    }
    async fn delete_route(&self, service_id: &str, route_id: &str) -> StoreResult<()> {
        self.as_ref().delete_route(service_id, route_id).await
    }
    async fn find_route(&self, service_id: &str, method: &str, path: &str) -> StoreResult<Route> {
        self.as_ref().find_route(service_id, method, path).await
    }
}

//! Non-persistent in-memory store for tests and local development.
//!
//! Mirrors the full [`ServiceStore`] contract including uniqueness conflicts
//! and cascade deletion of routes, so admin handlers behave identically no
//! matter which store backs them.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    core::model::{HealthState, Route, Service},
    ports::store::{ServiceStore, StoreError, StoreResult},
};

#[derive(Default)]
struct Inner {
    services: HashMap<String, Service>,
    routes: HashMap<String, Route>,
}

/// In-memory [`ServiceStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn load_enabled(&self) -> StoreResult<Vec<Service>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Service> = inner
            .services
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn list(&self) -> StoreResult<Vec<Service>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Service> = inner.services.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn get(&self, id: &str) -> StoreResult<Service> {
        let inner = self.inner.read().await;
        inner.services.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, service: &Service) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .services
            .values()
            .any(|s| s.public_prefix == service.public_prefix)
        {
            return Err(StoreError::Conflict(format!(
                "public_prefix already registered: {}",
                service.public_prefix
            )));
        }
        inner.services.insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn update(&self, service: &Service) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.services.contains_key(&service.id) {
            return Err(StoreError::NotFound);
        }
        if inner
            .services
            .values()
            .any(|s| s.id != service.id && s.public_prefix == service.public_prefix)
        {
            return Err(StoreError::Conflict(format!(
                "public_prefix already registered: {}",
                service.public_prefix
            )));
        }
        let mut updated = service.clone();
        updated.updated_at = Utc::now();
        inner.services.insert(service.id.clone(), updated);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.services.remove(id);
        inner.routes.retain(|_, r| r.service_id != id);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: HealthState,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let service = inner.services.get_mut(id).ok_or(StoreError::NotFound)?;
        service.last_status = Some(status);
        service.last_health_at = Some(at);
        service.updated_at = Utc::now();
        Ok(())
    }

    async fn list_routes(&self, service_id: &str) -> StoreResult<Vec<Route>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Route> = inner
            .routes
            .values()
            .filter(|r| r.service_id == service_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(list)
    }

    async fn get_route(&self, service_id: &str, route_id: &str) -> StoreResult<Route> {
        let inner = self.inner.read().await;
        inner
            .routes
            .get(route_id)
            .filter(|r| r.service_id == service_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_route(&self, route: &Route) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let method = route.method.to_ascii_uppercase();
        if inner.routes.values().any(|r| {
            r.service_id == route.service_id && r.method == method && r.path == route.path
        }) {
            return Err(StoreError::Conflict(format!(
                "route already exists: {} {}",
                method, route.path
            )));
        }
        let mut stored = route.clone();
        stored.method = method;
        inner.routes.insert(route.id.clone(), stored);
        Ok(())
    }

    async fn update_route(&self, route: &Route) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .routes
            .get(&route.id)
            .filter(|r| r.service_id == route.service_id);
        if existing.is_none() {
            return Err(StoreError::NotFound);
        }
        let mut stored = route.clone();
        stored.method = route.method.to_ascii_uppercase();
        stored.updated_at = Utc::now();
        inner.routes.insert(route.id.clone(), stored);
        Ok(())
    }

    async fn delete_route(&self, service_id: &str, route_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .routes
            .get(route_id)
            .is_some_and(|r| r.service_id == service_id);
        if owned {
            inner.routes.remove(route_id);
        }
        Ok(())
    }

    async fn find_route(&self, service_id: &str, method: &str, path: &str) -> StoreResult<Route> {
        let inner = self.inner.read().await;
        let method = method.to_ascii_uppercase();
        inner
            .routes
            .values()
            .find(|r| r.service_id == service_id && r.method == method && r.path == path)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Protocol;

    fn service(id: &str, prefix: &str) -> Service {
        Service {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            public_prefix: prefix.into(),
            base_url: "http://backend:8080".into(),
            swagger_url: String::new(),
            protocol: Protocol::Http,
            grpc_target: String::new(),
            enabled: true,
            swagger_json: None,
            last_refreshed_at: None,
            last_health_at: None,
            last_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn route(id: &str, service_id: &str, method: &str, path: &str) -> Route {
        Route {
            id: id.into(),
            service_id: service_id.into(),
            method: method.into(),
            path: path.into(),
            grpc_method: "pkg.Svc/Do".into(),
            query_mapping: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let store = MemoryStore::new();
        let mut svc = service("s1", "/api/users/");
        svc.swagger_json = Some(serde_json::json!({"openapi": "3.0.3"}));
        store.create(&svc).await.unwrap();

        let got = store.get("s1").await.unwrap();
        assert_eq!(got.public_prefix, "/api/users/");
        assert_eq!(got.swagger_json, svc.swagger_json);
    }

    #[tokio::test]
    async fn test_duplicate_prefix_conflicts() {
        let store = MemoryStore::new();
        store.create(&service("s1", "/api/users/")).await.unwrap();
        let err = store.create(&service("s2", "/api/users/")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_load_enabled_filters() {
        let store = MemoryStore::new();
        store.create(&service("s1", "/api/a/")).await.unwrap();
        let mut disabled = service("s2", "/api/b/");
        disabled.enabled = false;
        store.create(&disabled).await.unwrap();

        let snapshot = store.load_enabled().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "s1");
    }

    #[tokio::test]
    async fn test_load_enabled_is_stable() {
        let store = MemoryStore::new();
        store.create(&service("s1", "/api/a/")).await.unwrap();
        store.create(&service("s2", "/api/b/")).await.unwrap();

        let first = store.load_enabled().await.unwrap();
        let second = store.load_enabled().await.unwrap();
        let ids = |list: &[Service]| list.iter().map(|s| s.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_delete_cascades_routes() {
        let store = MemoryStore::new();
        store.create(&service("s1", "/api/a/")).await.unwrap();
        store.create_route(&route("r1", "s1", "GET", "/x")).await.unwrap();

        store.delete("s1").await.unwrap();
        assert!(store.list_routes("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_route_method_uppercased_and_unique() {
        let store = MemoryStore::new();
        store.create(&service("s1", "/api/a/")).await.unwrap();
        store.create_route(&route("r1", "s1", "get", "/x")).await.unwrap();

        let got = store.get_route("s1", "r1").await.unwrap();
        assert_eq!(got.method, "GET");

        let err = store
            .create_route(&route("r2", "s1", "GET", "/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_status_preserves_other_fields() {
        let store = MemoryStore::new();
        let svc = service("s1", "/api/a/");
        store.create(&svc).await.unwrap();

        store
            .update_status("s1", HealthState::Unhealthy, Utc::now())
            .await
            .unwrap();

        let got = store.get("s1").await.unwrap();
        assert_eq!(got.last_status, Some(HealthState::Unhealthy));
        assert_eq!(got.name, svc.name);
        assert_eq!(got.base_url, svc.base_url);
        assert_eq!(got.public_prefix, svc.public_prefix);
        assert_eq!(got.enabled, svc.enabled);
        assert_eq!(got.created_at, svc.created_at);
    }

    #[tokio::test]
    async fn test_find_route_by_triple() {
        let store = MemoryStore::new();
        store.create(&service("s1", "/api/a/")).await.unwrap();
        store.create_route(&route("r1", "s1", "GET", "/x")).await.unwrap();

        assert!(store.find_route("s1", "get", "/x").await.is_ok());
        assert!(matches!(
            store.find_route("s1", "GET", "/y").await.unwrap_err(),
            StoreError::NotFound
        ));
    }
}

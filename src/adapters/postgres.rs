//! Durable Postgres store for the service registry.
//!
//! Two tables live in a configurable schema: `gateway_services` and
//! `gateway_routes`. The schema identifier is validated before it is ever
//! interpolated into SQL; everything else is bound as a parameter.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Row,
    postgres::{PgPool, PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    config::sanitize_schema,
    core::model::{HealthState, Protocol, QueryMapping, Route, Service},
    ports::store::{ServiceStore, StoreError, StoreResult},
};

/// Postgres-backed [`ServiceStore`].
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    /// Connect to Postgres and build a store over the given schema.
    pub async fn connect(database_url: &str, schema: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("db connect: {e}")))?;
        Ok(Self::from_pool(pool, schema))
    }

    /// Build a store over an existing pool.
    pub fn from_pool(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            schema: sanitize_schema(schema),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn services_table(&self) -> String {
        format!("{}.gateway_services", self.schema)
    }

    fn routes_table(&self) -> String {
        format!("{}.gateway_routes", self.schema)
    }

    fn parse_id(id: &str) -> StoreResult<Uuid> {
        Uuid::parse_str(id).map_err(|_| StoreError::NotFound)
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn service_from_row(row: &PgRow) -> Result<Service, sqlx::Error> {
    let protocol: Option<String> = row.try_get("protocol")?;
    let last_status: Option<String> = row.try_get("last_status")?;
    Ok(Service {
        id: row.try_get::<Uuid, _>("id")?.to_string(),
        name: row.try_get("name")?,
        description: row.try_get::<Option<String>, _>("description")?.unwrap_or_default(),
        public_prefix: row.try_get("public_prefix")?,
        base_url: row.try_get("base_url")?,
        swagger_url: row.try_get("swagger_url")?,
        protocol: protocol
            .as_deref()
            .and_then(Protocol::parse)
            .unwrap_or_default(),
        grpc_target: row.try_get::<Option<String>, _>("grpc_target")?.unwrap_or_default(),
        enabled: row.try_get("enabled")?,
        swagger_json: row.try_get::<Option<serde_json::Value>, _>("swagger_json")?,
        last_refreshed_at: row.try_get("last_refreshed_at")?,
        last_health_at: row.try_get("last_health_at")?,
        last_status: last_status.as_deref().and_then(HealthState::parse),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn route_from_row(row: &PgRow) -> Result<Route, sqlx::Error> {
    let mapping: Option<serde_json::Value> = row.try_get("query_mapping")?;
    let query_mapping = mapping
        .and_then(|v| serde_json::from_value::<QueryMapping>(v).ok())
        .filter(|m| !m.is_empty());
    Ok(Route {
        id: row.try_get::<Uuid, _>("id")?.to_string(),
        service_id: row.try_get::<Uuid, _>("service_id")?.to_string(),
        method: row.try_get("method")?,
        path: row.try_get("path_pattern")?,
        grpc_method: row.try_get("grpc_method")?,
        query_mapping,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const SERVICE_COLUMNS: &str = "id, name, description, public_prefix, base_url, swagger_url, \
     protocol, grpc_target, enabled, swagger_json, last_refreshed_at, last_health_at, \
     last_status, created_at, updated_at";

const ROUTE_COLUMNS: &str =
    "id, service_id, method, path_pattern, grpc_method, query_mapping, created_at, updated_at";

#[async_trait]
impl ServiceStore for PgStore {
    async fn init(&self) -> StoreResult<()> {
        let schema = &self.schema;
        let services = self.services_table();
        let routes = self.routes_table();

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {services} (
               id UUID PRIMARY KEY,
               name TEXT NOT NULL,
               description TEXT,
               public_prefix TEXT NOT NULL UNIQUE,
               base_url TEXT NOT NULL,
               swagger_url TEXT NOT NULL,
               protocol TEXT NOT NULL DEFAULT 'http',
               grpc_target TEXT,
               enabled BOOLEAN NOT NULL DEFAULT TRUE,
               swagger_json JSONB,
               last_refreshed_at TIMESTAMPTZ,
               last_health_at TIMESTAMPTZ,
               last_status TEXT,
               created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
               updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
             )"
        ))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        // Additive evolution for tables created before transcoding support.
        sqlx::query(&format!(
            "ALTER TABLE {services} ADD COLUMN IF NOT EXISTS protocol TEXT NOT NULL DEFAULT 'http'"
        ))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        sqlx::query(&format!(
            "ALTER TABLE {services} ADD COLUMN IF NOT EXISTS grpc_target TEXT"
        ))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {routes} (
               id UUID PRIMARY KEY,
               service_id UUID NOT NULL REFERENCES {services}(id) ON DELETE CASCADE,
               method TEXT NOT NULL,
               path_pattern TEXT NOT NULL,
               grpc_method TEXT NOT NULL,
               query_mapping JSONB,
               created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
               updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
               UNIQUE(service_id, method, path_pattern)
             )"
        ))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn load_enabled(&self) -> StoreResult<Vec<Service>> {
        let q = format!(
            "SELECT {SERVICE_COLUMNS} FROM {} WHERE enabled = TRUE ORDER BY created_at ASC",
            self.services_table()
        );
        let rows = sqlx::query(&q).fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter()
            .map(|row| service_from_row(row).map_err(map_sqlx))
            .collect()
    }

    async fn list(&self) -> StoreResult<Vec<Service>> {
        let q = format!(
            "SELECT {SERVICE_COLUMNS} FROM {} ORDER BY created_at ASC",
            self.services_table()
        );
        let rows = sqlx::query(&q).fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter()
            .map(|row| service_from_row(row).map_err(map_sqlx))
            .collect()
    }

    async fn get(&self, id: &str) -> StoreResult<Service> {
        let q = format!(
            "SELECT {SERVICE_COLUMNS} FROM {} WHERE id = $1",
            self.services_table()
        );
        let row = sqlx::query(&q)
            .bind(Self::parse_id(id)?)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        service_from_row(&row).map_err(map_sqlx)
    }

    async fn create(&self, service: &Service) -> StoreResult<()> {
        let q = format!(
            "INSERT INTO {} (id, name, description, public_prefix, base_url, swagger_url, \
             protocol, grpc_target, enabled, swagger_json, last_refreshed_at, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11, now(), now())",
            self.services_table()
        );
        sqlx::query(&q)
            .bind(Self::parse_id(&service.id)?)
            .bind(&service.name)
            .bind(&service.description)
            .bind(&service.public_prefix)
            .bind(&service.base_url)
            .bind(&service.swagger_url)
            .bind(service.protocol.as_str())
            .bind(&service.grpc_target)
            .bind(service.enabled)
            .bind(&service.swagger_json)
            .bind(service.last_refreshed_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update(&self, service: &Service) -> StoreResult<()> {
        let q = format!(
            "UPDATE {} SET name=$2, description=$3, public_prefix=$4, base_url=$5, \
             swagger_url=$6, protocol=$7, grpc_target=$8, enabled=$9, swagger_json=$10, \
             last_refreshed_at=$11, updated_at=now() WHERE id=$1",
            self.services_table()
        );
        let result = sqlx::query(&q)
            .bind(Self::parse_id(&service.id)?)
            .bind(&service.name)
            .bind(&service.description)
            .bind(&service.public_prefix)
            .bind(&service.base_url)
            .bind(&service.swagger_url)
            .bind(service.protocol.as_str())
            .bind(&service.grpc_target)
            .bind(service.enabled)
            .bind(&service.swagger_json)
            .bind(service.last_refreshed_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let q = format!("DELETE FROM {} WHERE id = $1", self.services_table());
        sqlx::query(&q)
            .bind(Self::parse_id(id)?)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: HealthState,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let q = format!(
            "UPDATE {} SET last_status=$2, last_health_at=$3, updated_at=now() WHERE id=$1",
            self.services_table()
        );
        let result = sqlx::query(&q)
            .bind(Self::parse_id(id)?)
            .bind(status.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_routes(&self, service_id: &str) -> StoreResult<Vec<Route>> {
        let q = format!(
            "SELECT {ROUTE_COLUMNS} FROM {} WHERE service_id = $1 ORDER BY path_pattern ASC",
            self.routes_table()
        );
        let rows = sqlx::query(&q)
            .bind(Self::parse_id(service_id)?)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter()
            .map(|row| route_from_row(row).map_err(map_sqlx))
            .collect()
    }

    async fn get_route(&self, service_id: &str, route_id: &str) -> StoreResult<Route> {
        let q = format!(
            "SELECT {ROUTE_COLUMNS} FROM {} WHERE service_id=$1 AND id=$2",
            self.routes_table()
        );
        let row = sqlx::query(&q)
            .bind(Self::parse_id(service_id)?)
            .bind(Self::parse_id(route_id)?)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        route_from_row(&row).map_err(map_sqlx)
    }

    async fn create_route(&self, route: &Route) -> StoreResult<()> {
        let mapping = route
            .query_mapping
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("encode query_mapping: {e}")))?;
        let q = format!(
            "INSERT INTO {} (id, service_id, method, path_pattern, grpc_method, query_mapping) \
             VALUES ($1,$2,$3,$4,$5,$6)",
            self.routes_table()
        );
        sqlx::query(&q)
            .bind(Self::parse_id(&route.id)?)
            .bind(Self::parse_id(&route.service_id)?)
            .bind(route.method.to_ascii_uppercase())
            .bind(&route.path)
            .bind(&route.grpc_method)
            .bind(mapping)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update_route(&self, route: &Route) -> StoreResult<()> {
        let mapping = route
            .query_mapping
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("encode query_mapping: {e}")))?;
        let q = format!(
            "UPDATE {} SET method=$3, path_pattern=$4, grpc_method=$5, query_mapping=$6, \
             updated_at=now() WHERE id=$1 AND service_id=$2",
            self.routes_table()
        );
        let result = sqlx::query(&q)
            .bind(Self::parse_id(&route.id)?)
            .bind(Self::parse_id(&route.service_id)?)
            .bind(route.method.to_ascii_uppercase())
            .bind(&route.path)
            .bind(&route.grpc_method)
            .bind(mapping)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_route(&self, service_id: &str, route_id: &str) -> StoreResult<()> {
        let q = format!(
            "DELETE FROM {} WHERE service_id=$1 AND id=$2",
            self.routes_table()
        );
        sqlx::query(&q)
            .bind(Self::parse_id(service_id)?)
            .bind(Self::parse_id(route_id)?)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_route(&self, service_id: &str, method: &str, path: &str) -> StoreResult<Route> {
        let q = format!(
            "SELECT {ROUTE_COLUMNS} FROM {} WHERE service_id=$1 AND method=$2 AND path_pattern=$3",
            self.routes_table()
        );
        let row = sqlx::query(&q)
            .bind(Self::parse_id(service_id)?)
            .bind(method.to_ascii_uppercase())
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        route_from_row(&row).map_err(map_sqlx)
    }
}

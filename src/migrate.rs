//! Embedded schema migrations.
//!
//! Migrations are ordered by version name and tracked in a
//! `schema_migrations` table inside the configured schema. Running them is
//! idempotent: applied versions are skipped, so a restart against an
//! up-to-date database is a no-op.
use sqlx::PgPool;

use crate::{config::sanitize_schema, error::GatewayError};

/// `{{schema}}` in each statement is replaced with the validated schema name.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "000_schema.sql",
        "CREATE SCHEMA IF NOT EXISTS {{schema}}",
    ),
    (
        "001_gateway_services.sql",
        "CREATE TABLE IF NOT EXISTS {{schema}}.gateway_services (
           id UUID PRIMARY KEY,
           name TEXT NOT NULL,
           description TEXT,
           public_prefix TEXT NOT NULL UNIQUE,
           base_url TEXT NOT NULL,
           swagger_url TEXT NOT NULL,
           enabled BOOLEAN NOT NULL DEFAULT TRUE,
           swagger_json JSONB,
           last_refreshed_at TIMESTAMPTZ,
           last_health_at TIMESTAMPTZ,
           last_status TEXT,
           created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
           updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
         )",
    ),
];

/// Run all pending migrations against `schema`.
pub async fn run(pool: &PgPool, schema: &str) -> Result<(), GatewayError> {
    let schema = sanitize_schema(schema);

    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .execute(pool)
        .await
        .map_err(internal)?;
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {schema}.schema_migrations \
         (version TEXT PRIMARY KEY, applied_at TIMESTAMPTZ DEFAULT now())"
    ))
    .execute(pool)
    .await
    .map_err(internal)?;

    let applied: Vec<String> =
        sqlx::query_scalar(&format!("SELECT version FROM {schema}.schema_migrations"))
            .fetch_all(pool)
            .await
            .map_err(internal)?;

    for (version, template) in ordered_migrations() {
        if applied.iter().any(|v| v == version) {
            continue;
        }
        tracing::info!(version, "applying migration");
        let sql = template.replace("{{schema}}", &schema);
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| GatewayError::Internal(format!("apply {version}: {e}")))?;
        sqlx::query(&format!(
            "INSERT INTO {schema}.schema_migrations (version) VALUES ($1)"
        ))
        .bind(version)
        .execute(pool)
        .await
        .map_err(internal)?;
    }
    Ok(())
}

/// Migrations sorted by version name.
fn ordered_migrations() -> Vec<(&'static str, &'static str)> {
    let mut list: Vec<_> = MIGRATIONS.to_vec();
    list.sort_by_key(|(version, _)| *version);
    list
}

fn internal(err: sqlx::Error) -> GatewayError {
    GatewayError::Internal(format!("migration: {err}"))
}

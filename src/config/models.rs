//! Configuration data structures for Portico.
//!
//! The gateway is configured entirely through the environment so that it can
//! be dropped into a container orchestrator without a config file. All values
//! have defaults suitable for local development except `DATABASE_URL`, which
//! is required.
use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default interval between health probe cycles, in seconds.
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

/// Default Postgres schema holding the gateway tables.
pub const DEFAULT_DB_SCHEMA: &str = "gateway";

/// Top-level gateway configuration, collected from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// TCP port the public listener binds to.
    pub port: u16,
    /// Postgres connection string (source of truth for the registry).
    pub database_url: String,
    /// Schema holding `gateway_services` / `gateway_routes`. Validated; falls
    /// back to [`DEFAULT_DB_SCHEMA`] when the identifier is unsafe.
    pub db_schema: String,
    /// HMAC secret for admin bearer validation. Empty disables validation.
    pub jwt_secret: String,
    /// Interval between health probe cycles, in seconds.
    pub health_check_secs: u64,
    /// Redis address; when set, repository reads go through the cache layer.
    pub redis_addr: Option<String>,
}

impl GatewayConfig {
    /// Collect configuration from the process environment.
    ///
    /// `PORT`, `GATEWAY_DB_SCHEMA`, `JWT_SECRET`, `HEALTH_CHECK_SECONDS` and
    /// `REDIS_ADDR` are optional; `DATABASE_URL` must be present.
    pub fn from_env() -> eyre::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|_| eyre::eyre!("PORT is not a valid port number: {v}"))?,
            Err(_) => 8080,
        };
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| eyre::eyre!("DATABASE_URL is required"))?;
        let db_schema = sanitize_schema(
            &std::env::var("GATEWAY_DB_SCHEMA").unwrap_or_else(|_| DEFAULT_DB_SCHEMA.to_string()),
        );
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
        let health_check_secs = std::env::var("HEALTH_CHECK_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .map(|secs| secs as u64)
            .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS);
        let redis_addr = std::env::var("REDIS_ADDR").ok().filter(|v| !v.is_empty());

        Ok(Self {
            port,
            database_url,
            db_schema,
            jwt_secret,
            health_check_secs,
            redis_addr,
        })
    }

    /// Interval between health probe cycles.
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_secs)
    }
}

static SCHEMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("schema regex"));

/// Validate a schema identifier, falling back to the default when it could
/// not be used safely in interpolated SQL. Only `[a-z_][a-z0-9_]*` passes.
pub fn sanitize_schema(schema: &str) -> String {
    if SCHEMA_RE.is_match(schema) {
        schema.to_string()
    } else {
        tracing::warn!(schema, "invalid schema identifier, using default");
        DEFAULT_DB_SCHEMA.to_string()
    }
}

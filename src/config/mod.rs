pub mod models;

pub use models::{DEFAULT_DB_SCHEMA, GatewayConfig, sanitize_schema};

pub mod cache;
pub mod health_prober;
pub mod http_client;
pub mod http_handler;
pub mod memory;
pub mod postgres;
pub mod proxy;
pub mod swagger;

/// Re-export commonly used types from adapters
pub use cache::CachingStore;
pub use health_prober::HealthProber;
pub use http_client::HttpClientAdapter;
pub use http_handler::HttpHandler;
pub use memory::MemoryStore;
pub use postgres::PgStore;

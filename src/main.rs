use std::{net::SocketAddr, sync::Arc, time::Duration};

use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use portico::{
    Gateway, HttpClientAdapter, PgStore, app_router,
    adapters::{CachingStore, HealthProber},
    config::GatewayConfig,
    migrate,
    ports::{http_client::HttpClient, store::ServiceStore},
    tracing_setup,
    utils::GracefulShutdown,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;

    // Durable store: Postgres is the source of truth for the registry.
    let pg = PgStore::connect(&config.database_url, &config.db_schema)
        .await
        .context("Failed to connect to Postgres")?;

    migrate::run(pg.pool(), &config.db_schema)
        .await
        .map_err(|e| eyre!("Migrations failed: {e}"))?;
    pg.init().await.map_err(|e| eyre!("Store init failed: {e}"))?;

    // Optional Redis caching layer for repository reads.
    let store: Arc<dyn ServiceStore> = match &config.redis_addr {
        Some(addr) => {
            let redis = CachingStore::<Arc<dyn ServiceStore>>::open(addr)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!(addr = %addr, "repository caching enabled");
            let inner: Arc<dyn ServiceStore> = Arc::new(pg);
            Arc::new(CachingStore::new(inner, redis, Duration::from_secs(15)))
        }
        None => Arc::new(pg),
    };

    let http: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);

    let gateway = Gateway::new(store.clone(), http.clone());
    if let Err(e) = gateway.reload_index().await {
        tracing::warn!(error = %e, "initial registry load failed");
    }

    // Background health prober; runs for the life of the process.
    let prober = HealthProber::new(store, http, config.health_interval());
    tokio::spawn(async move { prober.run().await });

    // Graceful shutdown on SIGTERM / SIGINT.
    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let app = app_router(gateway, config.jwt_secret.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Portico API Gateway listening on {}", addr);
    println!("Portico API Gateway listening on {addr}");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        }
        reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!("Shutdown signal received: {:?}", reason);
            tracing::info!("Graceful shutdown completed");
        }
    }

    Ok(())
}

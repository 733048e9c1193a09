//! Background health prober.
//!
//! Every tick the prober reads the full service list and probes each enabled
//! service's `/healthz`. Results are written back through the store's
//! targeted status update so concurrent admin edits to other fields are never
//! clobbered. The prober never touches the runtime index; registry writes
//! invalidate caches and admin-triggered reloads refresh the index.
use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::sleep;

use crate::{
    core::model::HealthState,
    ports::{http_client::HttpClient, store::ServiceStore},
};

/// Per-probe timeout, seconds.
const PROBE_TIMEOUT_SECS: u64 = 3;

/// Liveness endpoint probed on every backend.
const PROBE_PATH: &str = "/healthz";

pub struct HealthProber {
    store: Arc<dyn ServiceStore>,
    http: Arc<dyn HttpClient>,
    interval: Duration,
}

impl HealthProber {
    pub fn new(store: Arc<dyn ServiceStore>, http: Arc<dyn HttpClient>, interval: Duration) -> Self {
        Self {
            store,
            http,
            interval,
        }
    }

    /// Run the probe loop forever. Spawn this once at startup.
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "starting health prober"
        );

        loop {
            // Sleep first so backends registered at boot have a moment to come up.
            sleep(self.interval).await;
            self.probe_all().await;
        }
    }

    /// One probe cycle over the full service list. List and update failures
    /// are logged and swallowed; the next tick retries everything.
    pub async fn probe_all(&self) {
        let services = match self.store.list().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "health prober could not list services");
                return;
            }
        };

        for service in services {
            if !service.enabled || service.base_url.is_empty() {
                continue;
            }

            let url = format!("{}{PROBE_PATH}", service.base_url.trim_end_matches('/'));
            let status = match self.http.health_check(&url, PROBE_TIMEOUT_SECS).await {
                Ok(true) => HealthState::Healthy,
                Ok(false) | Err(_) => HealthState::Unhealthy,
            };

            tracing::debug!(service = %service.id, url = %url, status = status.as_str(), "probe result");

            if let Err(e) = self
                .store
                .update_status(&service.id, status, Utc::now())
                .await
            {
                tracing::warn!(service = %service.id, error = %e, "status update failed");
            }
        }
    }
}

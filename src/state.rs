//! Shared gateway state threaded through the HTTP layers.
//!
//! The store is authoritative; the runtime index is derived from it and
//! swapped atomically on every reload. Handlers clone this struct freely.
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{
    core::index::RuntimeIndex,
    ports::{http_client::HttpClient, store::{ServiceStore, StoreResult}},
};

#[derive(Clone)]
pub struct Gateway {
    pub store: Arc<dyn ServiceStore>,
    pub index: Arc<ArcSwap<RuntimeIndex>>,
    pub http: Arc<dyn HttpClient>,
}

impl Gateway {
    pub fn new(store: Arc<dyn ServiceStore>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            store,
            index: Arc::new(ArcSwap::from_pointee(RuntimeIndex::default())),
            http,
        }
    }

    /// Rebuild the runtime index from the store's enabled snapshot and swap
    /// it in atomically.
    pub async fn reload_index(&self) -> StoreResult<()> {
        let snapshot = self.store.load_enabled().await?;
        let index = RuntimeIndex::from_snapshot(snapshot);
        tracing::debug!(prefixes = index.len(), "runtime index rebuilt");
        self.index.store(Arc::new(index));
        Ok(())
    }

    /// Best-effort reload after an admin mutation. The mutation is already
    /// durable; a failed reload is logged and retried on the next mutation
    /// or restart.
    pub async fn reload_index_logged(&self) {
        if let Err(e) = self.reload_index().await {
            tracing::error!(error = %e, "runtime index reload failed");
        }
    }
}

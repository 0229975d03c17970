//! Correlation service assembly
//!
//! Wires a [`ConfigStore`] to the store, the sync engine and the event
//! router. The enabled switch of the configuration gates the router, and
//! the configured shutdown mode is used when the service stops.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{CentralRepoConfig, ConfigStore};
use crate::content::CaseContent;
use crate::core::error::Result;
use crate::events::{CaseEvent, EventRouter, RouterError, RouterStatsSnapshot};
use crate::store::{open_store, CorrelationStore};
use crate::sync::CorrelationSyncEngine;
use crate::tag::TagIndex;

/// A running correlation pipeline
pub struct CorrelationService {
    config: CentralRepoConfig,
    store: Arc<dyn CorrelationStore>,
    router: EventRouter,
}

impl CorrelationService {
    /// Open the configured store and start the event router
    pub async fn start(
        config_store: &ConfigStore,
        tags: Arc<dyn TagIndex>,
        content: Arc<dyn CaseContent>,
    ) -> Result<Self> {
        let config = config_store.get().await;
        let store = open_store(&config.database).await?;
        let engine = CorrelationSyncEngine::new(store.clone(), tags, content);
        let router = EventRouter::start(engine, config_store.subscribe_enabled());

        if !config.enabled {
            warn!("Central repository is disabled; case events will be skipped");
        }
        info!(
            backend = ?config.database.backend,
            shutdown_mode = ?config.router.shutdown_mode,
            "Correlation service started"
        );

        Ok(Self {
            config,
            store,
            router,
        })
    }

    pub fn submit(&self, event: CaseEvent) -> std::result::Result<(), RouterError> {
        self.router.submit(event)
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.router.stats()
    }

    pub fn store(&self) -> &Arc<dyn CorrelationStore> {
        &self.store
    }

    /// Stop the router with the configured shutdown mode, then close the store
    pub async fn shutdown(&self) -> Result<()> {
        self.router.shutdown(self.config.router.shutdown_mode).await;
        self.store.close().await?;
        info!("Correlation service stopped");
        Ok(())
    }
}

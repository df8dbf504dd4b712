//! API Server
//!
//! Binds the REST router and serves it until a shutdown is requested.

use crate::error::{Error, Result};
use crate::registry::{NodeRegistry, RegistryMetrics, SnapshotFile};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::rest::RestRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            max_body_size: 64 * 1024,
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server for the node registry
pub struct ApiServer {
    config: ApiServerConfig,
    registry: Arc<NodeRegistry>,
    metrics: RegistryMetrics,
    store: Option<Arc<SnapshotFile>>,
    /// Latest value persists, so a request made before `run` is not lost
    shutdown_tx: watch::Sender<bool>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        registry: Arc<NodeRegistry>,
        metrics: RegistryMetrics,
        store: Option<Arc<SnapshotFile>>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            registry,
            metrics,
            store,
            shutdown_tx,
        }
    }

    /// Run the API server until [`shutdown`](Self::shutdown) is called
    pub async fn run(&self) -> Result<()> {
        let mut router = RestRouter::new(self.registry.clone(), self.metrics.clone())
            .with_max_body_size(self.config.max_body_size);
        if let Some(store) = &self.store {
            router = router.with_store(store.clone());
        }
        let app = router.build();

        let listener = tokio::net::TcpListener::bind(self.config.rest_addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

        info!("REST API listening on {}", self.config.rest_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

//! Service lifecycle for the data proxy

use async_trait::async_trait;
use geowatch_core::{GeowatchError, GeowatchService, HealthStatus, ReadinessStatus, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;

use crate::routes::create_router;
use crate::state::SERVICE_ID;
use crate::AppState;

pub struct DataProxyService {
    state: AppState,
    shutdown: Arc<Notify>,
}

impl DataProxyService {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl GeowatchService for DataProxyService {
    fn service_id(&self) -> &'static str {
        SERVICE_ID
    }

    async fn health(&self) -> HealthStatus {
        self.state.health_status()
    }

    async fn ready(&self) -> ReadinessStatus {
        self.state.readiness()
    }

    async fn shutdown(&self) -> Result<()> {
        // notify_one stores a permit if `start` is not waiting yet
        self.shutdown.notify_one();
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let bind_addr = self
            .state
            .config
            .bind_address()
            .map_err(|e| GeowatchError::Config(format!("Invalid bind address: {}", e)))?;

        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| GeowatchError::Network(format!("Failed to bind {}: {}", bind_addr, e)))?;
        info!(%bind_addr, backend = self.state.durable.backend(), "Data proxy listening");

        let app = create_router(self.state.clone());
        let shutdown = Arc::clone(&self.shutdown);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .map_err(|e| GeowatchError::Internal(format!("Server error: {}", e)))?;

        info!("Data proxy stopped accepting connections");
        Ok(())
    }
}

//! Data proxy binary

use geowatch_core::{MicroserviceRuntime, ServiceConfig};
use std::sync::Arc;
use tracing::info;

use data_proxy::{AppState, Config, DataProxyService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    geowatch_telemetry::init("data-proxy")?;

    info!("Starting Geowatch data proxy");

    // Load configuration
    let service_config = ServiceConfig::from_env()?;
    let config = Config::from_env()?;

    // Build application state
    let state = AppState::new(config)?;
    let service = DataProxyService::new(state);

    MicroserviceRuntime::new(service_config)
        .run(Arc::new(service))
        .await?;

    Ok(())
}

//! Service lifecycle shared by Geowatch binaries

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::Result;

/// Health status for liveness probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub service_id: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness status for readiness probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub dependencies: Vec<DependencyStatus>,
}

/// One upstream or cache backend as seen by the readiness probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub name: String,
    /// Configured and usable. A missing optional dependency reports `false`
    /// without making the service unready.
    pub available: bool,
    pub required: bool,
}

/// Standard trait every Geowatch binary implements
#[async_trait]
pub trait GeowatchService: Send + Sync + 'static {
    /// Service identifier (e.g. "data-proxy")
    fn service_id(&self) -> &'static str;

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    async fn health(&self) -> HealthStatus;

    async fn ready(&self) -> ReadinessStatus;

    async fn shutdown(&self) -> Result<()>;

    /// Runs the service until it fails or is aborted
    async fn start(&self) -> Result<()>;
}

/// Standard runtime bootstrap: start, wait for a signal, drain, stop
pub struct MicroserviceRuntime {
    config: ServiceConfig,
    start_time: std::time::Instant,
}

impl MicroserviceRuntime {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            start_time: std::time::Instant::now(),
        }
    }

    /// Run a service with standard lifecycle management
    pub async fn run<S: GeowatchService>(self, service: Arc<S>) -> Result<()> {
        info!(
            service_id = service.service_id(),
            version = service.version(),
            service_name = %self.config.service_name,
            "Starting service"
        );

        let runner = service.clone();
        let mut service_handle = tokio::spawn(async move { runner.start().await });

        tokio::select! {
            joined = &mut service_handle => {
                match joined {
                    Ok(Ok(())) => info!("Service exited"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Service error"),
                    Err(e) => tracing::error!(error = %e, "Service task failed"),
                }
                return Ok(());
            }
            _ = Self::wait_for_shutdown() => {}
        }

        info!("Shutdown signal received, draining");

        if let Err(e) = service.shutdown().await {
            warn!(error = %e, "Error during shutdown");
        }

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        if tokio::time::timeout(grace, &mut service_handle).await.is_err() {
            warn!(grace_secs = grace.as_secs(), "Service did not stop in time, aborting");
            service_handle.abort();
        }

        info!(
            uptime_seconds = self.start_time.elapsed().as_secs(),
            "Service stopped"
        );

        Ok(())
    }

    async fn wait_for_shutdown() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct OneShot {
        started: AtomicBool,
    }

    #[async_trait]
    impl GeowatchService for OneShot {
        fn service_id(&self) -> &'static str {
            "one-shot"
        }

        async fn health(&self) -> HealthStatus {
            HealthStatus {
                healthy: true,
                service_id: self.service_id().to_string(),
                version: self.version().to_string(),
                uptime_seconds: 0,
            }
        }

        async fn ready(&self) -> ReadinessStatus {
            ReadinessStatus {
                ready: true,
                dependencies: Vec::new(),
            }
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }

        async fn start(&self) -> Result<()> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_runtime_returns_when_service_exits() {
        let service = Arc::new(OneShot {
            started: AtomicBool::new(false),
        });
        let runtime = MicroserviceRuntime::new(ServiceConfig::default());

        tokio_test::assert_ok!(tokio_test::block_on(runtime.run(service.clone())));
        assert!(service.started.load(Ordering::SeqCst));
    }
}

//! Seam between the lifecycle manager and the background service it owns.

use crate::LaunchError;

use std::time::Duration;

use async_trait::async_trait;

/// Fully resolved parameters for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub host: String,
    pub port: u16,
    /// Host placed in the advertised address.
    pub public_host: String,
    pub advertised_name: String,
    /// Upper bound for bind + readiness.
    pub startup_timeout: Duration,
}

impl LaunchConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address peers use once the service listens on `port`.
    pub fn address_for(&self, port: u16) -> String {
        format!("http://{}:{}", self.public_host, port)
    }
}

/// Starts the background service.
#[async_trait]
pub trait ServiceLauncher: Send + Sync + 'static {
    /// Bind, start serving and resolve once the service is ready.
    async fn launch(&self, config: LaunchConfig) -> Result<Box<dyn RunningService>, LaunchError>;
}

/// Handle to a started service. Owned exclusively by the manager.
#[async_trait]
pub trait RunningService: Send + Sync {
    /// `http://<public_host>:<port>`
    fn address(&self) -> &str;

    /// Liveness probe used by the health monitor.
    async fn is_alive(&self) -> bool;

    /// Stop serving and release the socket.
    async fn shutdown(self: Box<Self>) -> Result<(), LaunchError>;
}

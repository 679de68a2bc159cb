//! axum implementation of the local server behind `ServiceLauncher`.

use crate::error::{Result as ServerErrorResult, ServerError};
use crate::{ServiceInfo, build_router};

use ls_core::{LaunchConfig, LaunchError, RunningService, ServiceLauncher};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::panic::Location;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use error_location::ErrorLocation;
use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const PROBE_TIMEOUT: Duration = Duration::from_millis(1000);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

type ServeTask = JoinHandle<std::io::Result<()>>;

/// Binds a TCP listener and serves the local server router on it.
pub struct HttpServiceLauncher {
    client: reqwest::Client,
}

impl HttpServiceLauncher {
    #[track_caller]
    pub fn new() -> ServerErrorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ServerError::HttpClient {
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ServiceLauncher for HttpServiceLauncher {
    async fn launch(&self, config: LaunchConfig) -> Result<Box<dyn RunningService>, LaunchError> {
        let bind_addr = config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| LaunchError::bind(&bind_addr, e))?;

        // Port 0 resolves to the OS-assigned port here
        let local_addr = listener
            .local_addr()
            .map_err(|e| LaunchError::bind(&bind_addr, e))?;
        let address = config.address_for(local_addr.port());
        info!("Local server listening on {local_addr}, advertised as {address}");

        let app = build_router(ServiceInfo {
            name: config.advertised_name.clone(),
            address: address.clone(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // A dropped sender also means shut down.
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let mut service = HttpService {
            address,
            ready_url: format!("http://{}/ready", probe_addr(local_addr)),
            client: self.client.clone(),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        };

        service.wait_ready(config.startup_timeout).await?;
        info!("Local server ready at {}", service.address);

        Ok(Box::new(service))
    }
}

/// Loopback stands in for wildcard binds.
fn probe_addr(local_addr: SocketAddr) -> SocketAddr {
    let ip = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local_addr.port())
}

/// A serving axum instance. Dropping it without `shutdown` aborts the server task.
struct HttpService {
    address: String,
    ready_url: String,
    client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<ServeTask>,
}

impl HttpService {
    async fn probe(&self) -> bool {
        match self.client.get(&self.ready_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Readiness probe {} failed: {e}", self.ready_url);
                false
            }
        }
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), LaunchError> {
        let started = Instant::now();

        while started.elapsed() < timeout {
            if self.task.as_ref().is_some_and(JoinHandle::is_finished) {
                return Err(self.take_serve_error().await);
            }

            if self.probe().await {
                return Ok(());
            }

            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        warn!(
            "Local server readiness check timed out after {}s",
            timeout.as_secs()
        );
        Err(LaunchError::not_ready(timeout.as_secs()))
    }

    async fn take_serve_error(&mut self) -> LaunchError {
        match self.task.take() {
            Some(task) => match task.await {
                Ok(Ok(())) => LaunchError::serve("server exited before becoming ready"),
                Ok(Err(e)) => LaunchError::serve(e.to_string()),
                Err(e) => LaunchError::serve(format!("server task failed: {e}")),
            },
            None => LaunchError::serve("server task missing"),
        }
    }
}

#[async_trait]
impl RunningService for HttpService {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_alive(&self) -> bool {
        if self.task.as_ref().is_none_or(JoinHandle::is_finished) {
            return false;
        }
        self.probe().await
    }

    async fn shutdown(self: Box<Self>) -> Result<(), LaunchError> {
        let mut service = self;

        if let Some(tx) = service.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(task) = service.task.take() else {
            return Ok(());
        };

        match task.await {
            Ok(Ok(())) => {
                info!("Local server at {} shut down", service.address);
                Ok(())
            }
            Ok(Err(e)) => Err(LaunchError::serve(e.to_string())),
            Err(e) => Err(LaunchError::serve(format!("server task failed: {e}"))),
        }
    }
}

impl Drop for HttpService {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Aborting local server task for {}", self.address);
            task.abort();
        }
    }
}

//! Local server lifecycle: start, stop, status and health monitoring.

use crate::service::{LaunchConfig, RunningService, ServiceLauncher};
use crate::{
    ServiceState, ServiceStatus, StartError, StartOptions, StartResult, StatusChannel, StopError,
    StopResult, Subscription, lock,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, error, info, warn};
use ls_config::{ConcurrentStart, LifecycleConfig, ServerConfig};
use tokio::task::JoinHandle;

type PendingStart = Shared<BoxFuture<'static, StartResult<ServiceStatus>>>;
type PendingStop = Shared<BoxFuture<'static, StopResult<()>>>;

const LOST_SERVICE_MESSAGE: &str = "service stopped responding";

/// Owns the background service and its status.
///
/// Cheap to clone; clones share the same service. Every transition is
/// published into the [`StatusChannel`] before the operation that caused it
/// returns.
///
/// Subscriber callbacks run while the transition is being applied, so they
/// may read status or subscribe but must not wait on `start`/`stop`.
#[derive(Clone)]
pub struct LocalServerManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    launcher: Arc<dyn ServiceLauncher>,
    server: ServerConfig,
    lifecycle: LifecycleConfig,
    channel: StatusChannel,
    status: Mutex<ServiceStatus>,
    /// Held while deciding and applying a transition.
    control: Mutex<Control>,
    /// Lifecycle lock: held across launch and shutdown.
    service: tokio::sync::Mutex<Option<Box<dyn RunningService>>>,
    launches: AtomicU64,
}

#[derive(Default)]
struct Control {
    pending_start: Option<PendingStart>,
    pending_stop: Option<PendingStop>,
    monitor: Option<JoinHandle<()>>,
}

enum StartPlan {
    AwaitStop(PendingStop),
    Join(PendingStart),
    Done(StartResult<ServiceStatus>),
}

impl LocalServerManager {
    pub fn new(
        launcher: Arc<dyn ServiceLauncher>,
        server: ServerConfig,
        lifecycle: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                launcher,
                server,
                lifecycle,
                channel: StatusChannel::new(),
                status: Mutex::new(ServiceStatus::stopped()),
                control: Mutex::new(Control::default()),
                service: tokio::sync::Mutex::new(None),
                launches: AtomicU64::new(0),
            }),
        }
    }

    /// Start the service, or join the attempt already in flight.
    ///
    /// The attempt runs on its own task, so dropping the returned future does
    /// not leave the manager in `starting`.
    pub async fn start(&self, options: StartOptions) -> StartResult<ServiceStatus> {
        loop {
            match self.inner.plan_start(&options) {
                StartPlan::AwaitStop(stop) => {
                    debug!("Start waiting for pending stop");
                    // The stop's outcome is reported to its own callers.
                    let _ = stop.await;
                }
                StartPlan::Join(attempt) => return attempt.await,
                StartPlan::Done(result) => return result,
            }
        }
    }

    /// Stop the service. Idempotent; queued behind an in-flight start.
    pub async fn stop(&self) -> StopResult<()> {
        let pending = {
            let mut control = lock(&self.inner.control);

            match control.pending_stop.clone() {
                Some(stop) => stop,
                None => {
                    let pending_start = control.pending_start.clone();

                    if pending_start.is_none() {
                        match self.inner.status().state() {
                            ServiceState::Stopped => {
                                debug!("Stop requested while already stopped");
                                return Ok(());
                            }
                            ServiceState::Error => {
                                info!("Error acknowledged, local server marked stopped");
                                self.inner.transition(ServiceStatus::stopped());
                                return Ok(());
                            }
                            _ => {}
                        }
                    }

                    let handle = tokio::spawn(Arc::clone(&self.inner).run_stop(pending_start));
                    let inner = Arc::clone(&self.inner);
                    let stop = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(e) => inner.abandon_stop(format!("stop task failed: {e}")),
                        }
                    }
                    .boxed()
                    .shared();

                    control.pending_stop = Some(stop.clone());
                    stop
                }
            }
        };

        pending.await
    }

    /// Latest status. Never touches the service.
    pub fn get_status(&self) -> ServiceStatus {
        self.inner.status()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ServiceStatus) + Send + Sync + 'static,
    {
        self.inner.channel.subscribe(callback)
    }

    pub(crate) fn server_config(&self) -> &ServerConfig {
        &self.inner.server
    }

    pub fn status_channel(&self) -> &StatusChannel {
        &self.inner.channel
    }

    /// Number of launches attempted over the manager's lifetime.
    pub fn launch_count(&self) -> u64 {
        self.inner.launches.load(Ordering::SeqCst)
    }
}

impl ManagerInner {
    fn status(&self) -> ServiceStatus {
        lock(&self.status).clone()
    }

    /// Apply and publish a transition. Callers hold the control lock.
    fn transition(&self, next: ServiceStatus) {
        let previous = {
            let mut status = lock(&self.status);
            std::mem::replace(&mut *status, next.clone())
        };

        if previous.state().can_transition_to(next.state()) {
            info!(
                "Local server status: {} -> {}",
                previous.state(),
                next.state()
            );
        } else {
            warn!(
                "Unexpected local server transition {} -> {}",
                previous.state(),
                next.state()
            );
        }

        self.channel.publish(next);
    }

    fn plan_start(self: &Arc<Self>, options: &StartOptions) -> StartPlan {
        let mut control = lock(&self.control);

        if let Some(stop) = control.pending_stop.clone() {
            return StartPlan::AwaitStop(stop);
        }

        if let Some(attempt) = control.pending_start.clone() {
            return match self.lifecycle.concurrent_start {
                ConcurrentStart::Join => {
                    debug!("Joining in-flight start");
                    StartPlan::Join(attempt)
                }
                ConcurrentStart::Reject => StartPlan::Done(Err(StartError::StartInProgress)),
            };
        }

        match self.status().state() {
            ServiceState::Running => return StartPlan::Done(Err(StartError::AlreadyRunning)),
            state @ (ServiceState::Starting | ServiceState::Stopping) => {
                warn!("Local server is {state} with no pending operation");
                return StartPlan::Done(Err(StartError::StartInProgress));
            }
            ServiceState::Error => self.transition(ServiceStatus::stopped()),
            ServiceState::Stopped => {}
        }

        let config = options.resolve(&self.server, &self.lifecycle);
        self.transition(ServiceStatus::starting());

        let handle = tokio::spawn(Arc::clone(self).run_start(config));
        let inner = Arc::clone(self);
        let attempt = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => inner.abandon_start(format!("start task failed: {e}")),
            }
        }
        .boxed()
        .shared();

        control.pending_start = Some(attempt.clone());
        StartPlan::Join(attempt)
    }

    async fn run_start(self: Arc<Self>, config: LaunchConfig) -> StartResult<ServiceStatus> {
        let mut service = self.service.lock().await;
        let generation = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        let timeout = config.startup_timeout;

        info!(
            "Starting local server '{}' on {}",
            config.advertised_name,
            config.bind_addr()
        );

        let launch = std::panic::AssertUnwindSafe(self.launcher.launch(config)).catch_unwind();
        let outcome = match tokio::time::timeout(timeout, launch).await {
            Ok(Ok(Ok(handle))) => Ok(handle),
            Ok(Ok(Err(e))) => Err(e.reason()),
            Ok(Err(_)) => Err(String::from("service launcher panicked")),
            Err(_) => Err(format!(
                "service did not start within {}s",
                timeout.as_secs()
            )),
        };

        let mut control = lock(&self.control);
        control.pending_start = None;

        match outcome {
            Ok(handle) => {
                let status = ServiceStatus::running(handle.address(), Utc::now());
                *service = Some(handle);
                self.transition(status.clone());
                control.monitor = Some(self.spawn_health_monitor(generation));
                Ok(status)
            }
            Err(reason) => {
                error!("Local server failed to start: {reason}");
                self.transition(ServiceStatus::error(reason.clone()));
                Err(StartError::StartFailure { reason })
            }
        }
    }

    fn abandon_start(&self, reason: String) -> StartResult<ServiceStatus> {
        error!("Local server start abandoned: {reason}");
        let mut control = lock(&self.control);
        control.pending_start = None;
        if self.status().state() == ServiceState::Starting {
            self.transition(ServiceStatus::error(reason.clone()));
        }
        Err(StartError::StartFailure { reason })
    }

    async fn run_stop(self: Arc<Self>, pending_start: Option<PendingStart>) -> StopResult<()> {
        if let Some(attempt) = pending_start {
            debug!("Stop queued behind in-flight start");
            let _ = attempt.await;
        }

        let mut service = self.service.lock().await;

        let handle = {
            let mut control = lock(&self.control);

            if let Some(monitor) = control.monitor.take() {
                monitor.abort();
            }

            match service.take() {
                Some(handle) => {
                    let started_at = self.status().started_at().unwrap_or_else(Utc::now);
                    info!("Stopping local server at {}", handle.address());
                    self.transition(ServiceStatus::stopping(started_at));
                    handle
                }
                None => {
                    control.pending_stop = None;
                    if self.status().state() == ServiceState::Error {
                        self.transition(ServiceStatus::stopped());
                    }
                    return Ok(());
                }
            }
        };

        let timeout_secs = self.lifecycle.shutdown_timeout_secs;
        let outcome =
            tokio::time::timeout(Duration::from_secs(timeout_secs), handle.shutdown()).await;

        let mut control = lock(&self.control);
        control.pending_stop = None;

        match outcome {
            Ok(Ok(())) => {
                self.transition(ServiceStatus::stopped());
                Ok(())
            }
            Ok(Err(e)) => {
                let reason = e.reason();
                error!("Local server failed to shut down: {e}");
                self.transition(ServiceStatus::error(format!("shutdown failed: {reason}")));
                Err(StopError::ShutdownFailed { reason })
            }
            Err(_) => {
                error!("Local server shutdown timed out after {timeout_secs}s");
                self.transition(ServiceStatus::error(format!(
                    "service did not stop within {timeout_secs}s"
                )));
                Err(StopError::ShutdownTimeout { timeout_secs })
            }
        }
    }

    fn abandon_stop(&self, reason: String) -> StopResult<()> {
        error!("Local server stop abandoned: {reason}");
        let mut control = lock(&self.control);
        control.pending_stop = None;
        if self.status().state() == ServiceState::Stopping {
            self.transition(ServiceStatus::error(reason.clone()));
        }
        Err(StopError::ShutdownFailed { reason })
    }

    /// Probe the service while running. With pausing enabled the monitor
    /// sleeps until someone is subscribed to the status channel.
    fn spawn_health_monitor(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let interval = Duration::from_secs(self.lifecycle.health_check_interval_secs);
        let pause = self.lifecycle.pause_polling_without_subscribers;
        let mut live = self.channel.watch_subscribers();

        tokio::spawn(async move {
            loop {
                if pause && live.wait_for(|count| *count > 0).await.is_err() {
                    break;
                }

                tokio::time::sleep(interval).await;

                let Some(inner) = Weak::upgrade(&weak) else {
                    break;
                };

                match inner.probe().await {
                    Some(true) => {}
                    Some(false) => {
                        inner.handle_lost_service(generation).await;
                        break;
                    }
                    None => break,
                }
            }
            debug!("Health monitor for launch {generation} finished");
        })
    }

    /// `None` once the service has been released.
    async fn probe(&self) -> Option<bool> {
        let service = self.service.lock().await;
        match service.as_ref() {
            Some(handle) => Some(handle.is_alive().await),
            None => None,
        }
    }

    async fn handle_lost_service(&self, generation: u64) {
        let mut service = self.service.lock().await;
        if self.launches.load(Ordering::SeqCst) != generation {
            return;
        }
        let Some(handle) = service.take() else {
            return;
        };

        {
            let mut control = lock(&self.control);
            control.monitor = None;
            error!("Local server at {} stopped responding", handle.address());
            self.transition(ServiceStatus::error(LOST_SERVICE_MESSAGE));
        }

        if let Err(e) = handle.shutdown().await {
            warn!("Failed to release unresponsive service: {e}");
        }
    }
}

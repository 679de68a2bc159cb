mod gateway;

use crate::{
    LaunchConfig, LaunchError, LocalServerManager, RunningService, ServiceLauncher, ServiceState,
    ServiceStatus,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ls_config::{LifecycleConfig, ServerConfig};
use tokio::sync::Notify;

/// Port reported by the fake when asked for an OS-assigned one.
pub(crate) const FAKE_EPHEMERAL_PORT: u16 = 49152;

/// In-memory launcher with switches for every failure mode the manager handles.
#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    pub launches: Arc<AtomicUsize>,
    pub shutdowns: Arc<AtomicUsize>,
    pub dead: Arc<AtomicBool>,
    pub fail_shutdown: Arc<AtomicBool>,
    pub fail_with: Arc<Mutex<Option<String>>>,
    pub panic_on_launch: Arc<AtomicBool>,
    gate: Option<Arc<Notify>>,
}

impl FakeLauncher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Launches block until `release()` is called.
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::default()
        }
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(crate) fn fail_next(&self, reason: &str) {
        *self.fail_with.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceLauncher for FakeLauncher {
    async fn launch(&self, config: LaunchConfig) -> Result<Box<dyn RunningService>, LaunchError> {
        self.launches.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.panic_on_launch.load(Ordering::SeqCst) {
            panic!("launcher exploded");
        }

        if let Some(reason) = self.fail_with.lock().unwrap().clone() {
            return Err(LaunchError::serve(reason));
        }

        let port = if config.port == 0 {
            FAKE_EPHEMERAL_PORT
        } else {
            config.port
        };

        Ok(Box::new(FakeService {
            address: config.address_for(port),
            dead: self.dead.clone(),
            fail_shutdown: self.fail_shutdown.clone(),
            shutdowns: self.shutdowns.clone(),
        }))
    }
}

struct FakeService {
    address: String,
    dead: Arc<AtomicBool>,
    fail_shutdown: Arc<AtomicBool>,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl RunningService for FakeService {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_alive(&self) -> bool {
        !self.dead.load(Ordering::SeqCst)
    }

    async fn shutdown(self: Box<Self>) -> Result<(), LaunchError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown.load(Ordering::SeqCst) {
            return Err(LaunchError::serve("socket refused to close"));
        }
        Ok(())
    }
}

pub(crate) fn test_lifecycle() -> LifecycleConfig {
    LifecycleConfig {
        startup_timeout_secs: 5,
        shutdown_timeout_secs: 5,
        health_check_interval_secs: 1,
        ..LifecycleConfig::default()
    }
}

pub(crate) fn manager_with(
    launcher: &FakeLauncher,
    lifecycle: LifecycleConfig,
) -> LocalServerManager {
    LocalServerManager::new(
        Arc::new(launcher.clone()),
        ServerConfig::default(),
        lifecycle,
    )
}

pub(crate) fn manager(launcher: &FakeLauncher) -> LocalServerManager {
    manager_with(launcher, test_lifecycle())
}

pub(crate) type Recorded = Arc<Mutex<Vec<ServiceStatus>>>;

/// Subscriber callback that records every snapshot it receives.
pub(crate) fn recorder() -> (Recorded, impl Fn(&ServiceStatus) + Send + Sync + 'static) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    (recorded, move |status: &ServiceStatus| {
        sink.lock().unwrap().push(status.clone())
    })
}

pub(crate) fn states(recorded: &Recorded) -> Vec<ServiceState> {
    recorded
        .lock()
        .unwrap()
        .iter()
        .map(ServiceStatus::state)
        .collect()
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 2s");
}

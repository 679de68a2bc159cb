//! Local server lifecycle, status broadcast and device pairing.
//!
//! [`LocalServerManager`] owns the background service and publishes every
//! state transition into a [`StatusChannel`]. UI surfaces reach both through
//! a [`ControlSurfaceGateway`], which also renders pairing images via
//! [`PairingCodeGenerator`].

mod error;
mod gateway;
mod manager;
mod pairing;
mod service;
mod start_options;
mod status;
mod status_channel;

#[cfg(test)]
mod tests;

pub use error::{
    EncodingError, GatewayError, GatewayResult, LaunchError, StartError, StartResult, StopError,
    StopResult,
};
pub use gateway::{CapabilityAllowList, ControlSurfaceGateway, Operation, SurfaceId};
pub use manager::LocalServerManager;
pub use pairing::{PairingCodeGenerator, PairingImage, RenderOptions, Rgba};
pub use service::{LaunchConfig, RunningService, ServiceLauncher};
pub use start_options::StartOptions;
pub use status::{ServiceState, ServiceStatus};
pub use status_channel::{StatusChannel, Subscription, SubscriptionId};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

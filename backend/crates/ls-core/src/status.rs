use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of the local server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Error => "error",
        }
    }

    /// Whether the UI should show a transition indicator.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    /// Edges of the lifecycle state machine.
    ///
    /// `stopped -> starting -> running -> stopping -> stopped`, any state may
    /// fail into `error`, and `error` only leaves towards `stopped`.
    pub fn can_transition_to(&self, next: ServiceState) -> bool {
        use ServiceState::*;

        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Running, Stopping)
                | (Stopping, Stopped)
                | (Error, Stopped)
                | (Stopped | Starting | Running | Stopping, Error)
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of the local server's status.
///
/// Only the per-state constructors build a snapshot, so `address` is set only
/// while running, `error` only in the error state and `started_at` only while
/// running or stopping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    state: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
}

impl ServiceStatus {
    pub fn stopped() -> Self {
        Self::bare(ServiceState::Stopped)
    }

    pub fn starting() -> Self {
        Self::bare(ServiceState::Starting)
    }

    pub fn running(address: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            state: ServiceState::Running,
            address: Some(address.into()),
            error: None,
            started_at: Some(started_at),
        }
    }

    pub fn stopping(started_at: DateTime<Utc>) -> Self {
        Self {
            state: ServiceState::Stopping,
            address: None,
            error: None,
            started_at: Some(started_at),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Error,
            address: None,
            error: Some(message.into()),
            started_at: None,
        }
    }

    fn bare(state: ServiceState) -> Self {
        Self {
            state,
            address: None,
            error: None,
            started_at: None,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::stopped()
    }
}

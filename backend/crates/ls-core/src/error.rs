use crate::gateway::Operation;

use std::panic::Location;

use error_location::ErrorLocation;
use ls_config::ErrorCorrection;
use thiserror::Error;

/// Outcome of a failed `start`. Cloneable so joined callers share one result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("Local server is already running")]
    AlreadyRunning,

    #[error("A start request is already in progress")]
    StartInProgress,

    #[error("Local server failed to start: {reason}")]
    StartFailure { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StopError {
    #[error("Local server failed to shut down: {reason}")]
    ShutdownFailed { reason: String },

    #[error("Local server shutdown timed out after {timeout_secs}s")]
    ShutdownTimeout { timeout_secs: u64 },
}

/// Failures raised by a `ServiceLauncher` or a running service.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to bind {address}: {source} {location}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Service did not become ready within {timeout_secs}s {location}")]
    NotReady {
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("Service error: {message} {location}")]
    Serve {
        message: String,
        location: ErrorLocation,
    },
}

impl LaunchError {
    #[track_caller]
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_ready(timeout_secs: u64) -> Self {
        Self::NotReady {
            timeout_secs,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn serve(message: impl Into<String>) -> Self {
        Self::Serve {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Message suitable for `ServiceStatus.error` (no source location).
    pub fn reason(&self) -> String {
        match self {
            Self::Bind {
                address, source, ..
            } => format!("Failed to bind {address}: {source}"),
            Self::NotReady { timeout_secs, .. } => {
                format!("Service did not become ready within {timeout_secs}s")
            }
            Self::Serve { message, .. } => message.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error(
        "Pairing text of {length} bytes exceeds QR capacity at error correction {level:?} {location}"
    )]
    CapacityExceeded {
        length: usize,
        level: ErrorCorrection,
        location: ErrorLocation,
    },

    #[error("Pairing text cannot be encoded: {message} {location}")]
    Unencodable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid render options: {message} {location}")]
    InvalidRenderOptions {
        message: String,
        location: ErrorLocation,
    },
}

impl EncodingError {
    #[track_caller]
    pub(crate) fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidRenderOptions {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Surface '{surface}' is not allowed to call '{operation}' {location}")]
    Unauthorized {
        surface: String,
        operation: Operation,
        location: ErrorLocation,
    },

    #[error("Invalid start options: {message} {location}")]
    InvalidOptions {
        message: String,
        location: ErrorLocation,
    },

    #[error("Allow-list for surface '{surface}' names unknown operation '{operation}' {location}")]
    InvalidAllowList {
        surface: String,
        operation: String,
        location: ErrorLocation,
    },

    #[error("Local server is not running {location}")]
    ServiceNotRunning { location: ErrorLocation },

    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Stop(#[from] StopError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl GatewayError {
    #[track_caller]
    pub(crate) fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Stable code for IPC consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidOptions { .. } => "INVALID_OPTIONS",
            Self::InvalidAllowList { .. } => "INVALID_ALLOW_LIST",
            Self::ServiceNotRunning { .. } => "SERVICE_NOT_RUNNING",
            Self::Start(StartError::AlreadyRunning) => "ALREADY_RUNNING",
            Self::Start(StartError::StartInProgress) => "START_IN_PROGRESS",
            Self::Start(StartError::StartFailure { .. }) => "START_FAILURE",
            Self::Stop(_) => "STOP_FAILURE",
            Self::Encoding(_) => "ENCODING_ERROR",
        }
    }
}

pub type StartResult<T> = std::result::Result<T, StartError>;
pub type StopResult<T> = std::result::Result<T, StopError>;
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

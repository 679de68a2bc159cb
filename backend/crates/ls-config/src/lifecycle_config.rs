use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
    DEFAULT_PAUSE_POLLING_WITHOUT_SUBSCRIBERS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
    DEFAULT_STARTUP_TIMEOUT_SECS, MAX_TIMEOUT_SECS,
};

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What a second `start` does while another start is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrentStart {
    /// Share the in-flight attempt's result
    #[default]
    Join,
    /// Reject with `StartInProgress`
    Reject,
}

impl FromStr for ConcurrentStart {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "join" => Ok(Self::Join),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::lifecycle(format!(
                "concurrent_start must be 'join' or 'reject', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ConcurrentStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => write!(f, "join"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound for the service to bind and signal readiness
    pub startup_timeout_secs: u64,
    /// Upper bound for releasing the service on stop
    pub shutdown_timeout_secs: u64,
    /// Interval between liveness probes while running
    pub health_check_interval_secs: u64,
    pub concurrent_start: ConcurrentStart,
    /// Skip liveness probes while nobody is subscribed to status
    pub pause_polling_without_subscribers: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            concurrent_start: ConcurrentStart::default(),
            pause_polling_without_subscribers: DEFAULT_PAUSE_POLLING_WITHOUT_SUBSCRIBERS,
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        Self::validate_secs("startup_timeout_secs", self.startup_timeout_secs)?;
        Self::validate_secs("shutdown_timeout_secs", self.shutdown_timeout_secs)?;
        Self::validate_secs(
            "health_check_interval_secs",
            self.health_check_interval_secs,
        )?;
        Ok(())
    }

    fn validate_secs(field: &str, value: u64) -> ConfigErrorResult<()> {
        if value == 0 || value > MAX_TIMEOUT_SECS {
            return Err(ConfigError::lifecycle(format!(
                "lifecycle.{field} must be 1-{MAX_TIMEOUT_SECS}, got {value}"
            )));
        }
        Ok(())
    }
}

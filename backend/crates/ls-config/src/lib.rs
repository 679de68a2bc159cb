mod config;
mod error;
mod gateway_config;
mod lifecycle_config;
mod log_level;
mod logging_config;
mod pairing_config;
mod server_config;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use error::{ConfigError, ConfigErrorResult};
pub use gateway_config::GatewayConfig;
pub use lifecycle_config::{ConcurrentStart, LifecycleConfig};
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use pairing_config::{ErrorCorrection, PairingConfig};
pub use server_config::{ServerConfig, is_wildcard_host};

const CONFIG_DIR_ENV: &str = "LS_CONFIG_DIR";
const CONFIG_DIR_NAME: &str = "ls-launcher";
const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ADVERTISED_NAME: &str = "Local Server";
pub const MIN_PORT: u16 = 1024;
pub const MAX_ADVERTISED_NAME_LENGTH: usize = 64;

const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 5;
const DEFAULT_PAUSE_POLLING_WITHOUT_SUBSCRIBERS: bool = true;
const MAX_TIMEOUT_SECS: u64 = 600;

const DEFAULT_PAIRING_MARGIN: u32 = 4;
const DEFAULT_PAIRING_WIDTH: u32 = 256;
const DEFAULT_PAIRING_DARK: &str = "#000000ff";
const DEFAULT_PAIRING_LIGHT: &str = "#ffffffff";
pub const MAX_PAIRING_MARGIN: u32 = 64;
pub const MAX_PAIRING_WIDTH: u32 = 4096;

const DEFAULT_SURFACE: &str = "main";
const SETTINGS_SURFACE: &str = "settings";

const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "log";
const DEFAULT_LOG_COLORED: bool = true;

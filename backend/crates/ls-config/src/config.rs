use crate::{
    CONFIG_DIR_ENV, CONFIG_DIR_NAME, CONFIG_FILENAME, ConfigError, ConfigErrorResult,
    GatewayConfig, LifecycleConfig, LoggingConfig, PairingConfig, ServerConfig,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub lifecycle: LifecycleConfig,
    pub pairing: PairingConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from disk and environment.
    ///
    /// Loading order:
    /// 1. LS_CONFIG_DIR env var, else the platform config dir + `ls-launcher/`
    /// 2. Auto-create the config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply LS_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: LS_CONFIG_DIR env var > <platform config dir>/ls-launcher
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.server.validate()?;
        self.lifecycle.validate()?;
        self.pairing.validate()?;
        self.gateway.validate()?;
        Ok(())
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  server: {}:{} (advertised as '{}' on {})",
            self.server.host,
            self.server.port,
            self.server.advertised_name,
            self.server.advertised_host()
        );
        info!(
            "  lifecycle: startup={}s, shutdown={}s, health={}s, concurrent_start={}, pause_polling={}",
            self.lifecycle.startup_timeout_secs,
            self.lifecycle.shutdown_timeout_secs,
            self.lifecycle.health_check_interval_secs,
            self.lifecycle.concurrent_start,
            self.lifecycle.pause_polling_without_subscribers
        );
        info!(
            "  pairing: width={}px, margin={}, ec={:?}",
            self.pairing.width, self.pairing.margin, self.pairing.error_correction
        );
        for (surface, operations) in &self.gateway.allow {
            info!("  gateway: {} -> [{}]", surface, operations.join(", "));
        }
        info!(
            "  logging: {} (colored: {}, file: {})",
            self.logging.level,
            self.logging.colored,
            self.logging.file.as_deref().unwrap_or("stdout")
        );
    }

    fn apply_env_overrides(&mut self) {
        // Server
        Self::apply_env_string("LS_SERVER_HOST", &mut self.server.host);
        Self::apply_env_parse("LS_SERVER_PORT", &mut self.server.port);
        Self::apply_env_option_string("LS_SERVER_PUBLIC_HOST", &mut self.server.public_host);
        Self::apply_env_string("LS_SERVER_NAME", &mut self.server.advertised_name);

        // Lifecycle
        Self::apply_env_parse(
            "LS_STARTUP_TIMEOUT_SECS",
            &mut self.lifecycle.startup_timeout_secs,
        );
        Self::apply_env_parse(
            "LS_SHUTDOWN_TIMEOUT_SECS",
            &mut self.lifecycle.shutdown_timeout_secs,
        );
        Self::apply_env_parse(
            "LS_HEALTH_CHECK_INTERVAL_SECS",
            &mut self.lifecycle.health_check_interval_secs,
        );
        Self::apply_env_parse("LS_CONCURRENT_START", &mut self.lifecycle.concurrent_start);
        Self::apply_env_bool(
            "LS_PAUSE_POLLING_WITHOUT_SUBSCRIBERS",
            &mut self.lifecycle.pause_polling_without_subscribers,
        );

        // Pairing
        Self::apply_env_parse("LS_PAIRING_WIDTH", &mut self.pairing.width);
        Self::apply_env_parse("LS_PAIRING_MARGIN", &mut self.pairing.margin);
        Self::apply_env_parse(
            "LS_PAIRING_ERROR_CORRECTION",
            &mut self.pairing.error_correction,
        );

        // Logging
        Self::apply_env_parse("LS_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("LS_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_option_string("LS_LOG_FILE", &mut self.logging.file);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T>(var_name: &str, target: &mut T)
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        if let Ok(val) = std::env::var(var_name)
            && let Some(parsed) = Self::parse_env_value(var_name, &val)
        {
            *target = parsed;
        }
    }

    /// Parse an override value; a rejected value is logged and ignored.
    pub(crate) fn parse_env_value<T>(var_name: &str, val: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring {var_name}='{val}': {e}");
                None
            }
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}

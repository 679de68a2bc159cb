use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_ADVERTISED_NAME, DEFAULT_HOST, DEFAULT_PORT,
    MAX_ADVERTISED_NAME_LENGTH, MIN_PORT,
};

use std::net::IpAddr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface the local service binds to
    pub host: String,
    /// Preferred port (0 = OS auto-assign)
    pub port: u16,
    /// Host written into the advertised address; falls back to `host`.
    /// Required when `host` is a wildcard.
    pub public_host: Option<String>,
    /// Name shown to devices that join
    pub advertised_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            public_host: None,
            advertised_name: String::from(DEFAULT_ADVERTISED_NAME),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        // Port 0 means "auto-assign" - OS picks an available port.
        if self.port != 0 && self.port < MIN_PORT {
            return Err(ConfigError::server(format!(
                "server.port must be 0 (auto) or >= {}, got {}",
                MIN_PORT, self.port
            )));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::server("server.host cannot be empty"));
        }

        if let Some(ref public_host) = self.public_host
            && public_host.trim().is_empty()
        {
            return Err(ConfigError::server(
                "server.public_host cannot be empty when set",
            ));
        }

        if is_wildcard_host(&self.host) && self.public_host.is_none() {
            return Err(ConfigError::server(format!(
                "server.host '{}' listens on every interface; set server.public_host to the address devices should dial",
                self.host
            )));
        }

        let name_len = self.advertised_name.chars().count();
        if name_len == 0 || name_len > MAX_ADVERTISED_NAME_LENGTH {
            return Err(ConfigError::server(format!(
                "server.advertised_name must be 1-{} characters, got {}",
                MAX_ADVERTISED_NAME_LENGTH, name_len
            )));
        }

        Ok(())
    }

    /// Host used when building the address devices connect to.
    pub fn advertised_host(&self) -> &str {
        self.public_host.as_deref().unwrap_or(&self.host)
    }
}

/// True for the unspecified addresses (`0.0.0.0`, `::`), which can be bound but not dialed.
pub fn is_wildcard_host(host: &str) -> bool {
    host.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_unspecified())
}

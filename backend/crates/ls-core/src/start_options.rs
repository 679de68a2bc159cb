use crate::service::LaunchConfig;
use crate::{GatewayError, GatewayResult};

use std::time::Duration;

use ls_config::{
    LifecycleConfig, MAX_ADVERTISED_NAME_LENGTH, MIN_PORT, ServerConfig, is_wildcard_host,
};
use serde::Deserialize;

/// Caller-supplied overrides for a single `start` request.
///
/// Unset fields fall back to the `[server]` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartOptions {
    /// 0 asks the OS for a free port.
    pub port: Option<u16>,
    pub host: Option<String>,
    pub advertised_name: Option<String>,
}

impl StartOptions {
    pub fn with_port(port: u16) -> Self {
        Self {
            port: Some(port),
            ..Self::default()
        }
    }

    /// Check the overrides against the `[server]` section they will be merged with.
    pub fn validate(&self, server: &ServerConfig) -> GatewayResult<()> {
        if let Some(port) = self.port
            && port != 0
            && port < MIN_PORT
        {
            return Err(GatewayError::invalid_options(format!(
                "port must be 0 (auto) or >= {MIN_PORT}, got {port}"
            )));
        }

        if let Some(ref host) = self.host
            && host.trim().is_empty()
        {
            return Err(GatewayError::invalid_options("host cannot be empty"));
        }

        let host = self.host.as_deref().unwrap_or(&server.host);
        if is_wildcard_host(host) && server.public_host.is_none() {
            return Err(GatewayError::invalid_options(format!(
                "host '{host}' cannot be advertised to devices without server.public_host"
            )));
        }

        if let Some(ref name) = self.advertised_name {
            let len = name.chars().count();
            if len == 0 || len > MAX_ADVERTISED_NAME_LENGTH {
                return Err(GatewayError::invalid_options(format!(
                    "advertisedName must be 1-{MAX_ADVERTISED_NAME_LENGTH} characters, got {len}"
                )));
            }
        }

        Ok(())
    }

    /// Merge with configuration into what the launcher receives.
    pub fn resolve(&self, server: &ServerConfig, lifecycle: &LifecycleConfig) -> LaunchConfig {
        let host = self.host.clone().unwrap_or_else(|| server.host.clone());
        let public_host = server
            .public_host
            .clone()
            .unwrap_or_else(|| host.clone());

        LaunchConfig {
            host,
            port: self.port.unwrap_or(server.port),
            public_host,
            advertised_name: self
                .advertised_name
                .clone()
                .unwrap_or_else(|| server.advertised_name.clone()),
            startup_timeout: Duration::from_secs(lifecycle.startup_timeout_secs),
        }
    }
}

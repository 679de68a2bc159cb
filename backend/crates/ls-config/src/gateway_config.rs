use crate::{ConfigError, ConfigErrorResult, DEFAULT_SURFACE, SETTINGS_SURFACE};

use std::collections::BTreeMap;

use serde::Deserialize;

/// Capability grants per UI surface.
///
/// Operation names are checked when the gateway is built, so a typo here
/// stops startup instead of silently denying a surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub allow: BTreeMap<String, Vec<String>>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut allow = BTreeMap::new();
        allow.insert(
            String::from(DEFAULT_SURFACE),
            ["start", "stop", "getStatus", "subscribe", "makePairingImage"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        allow.insert(
            String::from(SETTINGS_SURFACE),
            ["getStatus", "subscribe", "makePairingImage"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        Self { allow }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if let Some(surface) = self.allow.keys().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::gateway(format!(
                "gateway.allow has an empty surface name: '{surface}'"
            )));
        }
        Ok(())
    }

    /// Surface used by the host process itself.
    pub fn default_surface() -> &'static str {
        DEFAULT_SURFACE
    }
}

use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_PAIRING_DARK, DEFAULT_PAIRING_LIGHT,
    DEFAULT_PAIRING_MARGIN, DEFAULT_PAIRING_WIDTH, MAX_PAIRING_MARGIN, MAX_PAIRING_WIDTH,
};

use std::str::FromStr;

use serde::Deserialize;

/// QR error correction level; higher levels trade capacity for robustness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ErrorCorrection {
    #[serde(alias = "l")]
    L,
    #[default]
    #[serde(alias = "m")]
    M,
    #[serde(alias = "q")]
    Q,
    #[serde(alias = "h")]
    H,
}

impl FromStr for ErrorCorrection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            other => Err(ConfigError::pairing(format!(
                "error_correction must be one of L, M, Q, H, got '{other}'"
            ))),
        }
    }
}

/// Default render options for pairing images.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Quiet zone around the code, in modules
    pub margin: u32,
    /// Rendered image width in pixels
    pub width: u32,
    pub dark: String,
    pub light: String,
    pub error_correction: ErrorCorrection,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_PAIRING_MARGIN,
            width: DEFAULT_PAIRING_WIDTH,
            dark: String::from(DEFAULT_PAIRING_DARK),
            light: String::from(DEFAULT_PAIRING_LIGHT),
            error_correction: ErrorCorrection::default(),
        }
    }
}

impl PairingConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.width == 0 || self.width > MAX_PAIRING_WIDTH {
            return Err(ConfigError::pairing(format!(
                "pairing.width must be 1-{}, got {}",
                MAX_PAIRING_WIDTH, self.width
            )));
        }

        if self.margin > MAX_PAIRING_MARGIN {
            return Err(ConfigError::pairing(format!(
                "pairing.margin must be 0-{}, got {}",
                MAX_PAIRING_MARGIN, self.margin
            )));
        }

        for (field, value) in [("dark", &self.dark), ("light", &self.light)] {
            if !value.starts_with('#') {
                return Err(ConfigError::pairing(format!(
                    "pairing.{field} must be a hex color like #000000ff, got '{value}'"
                )));
            }
        }

        Ok(())
    }
}

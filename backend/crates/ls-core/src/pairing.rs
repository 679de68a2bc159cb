use crate::EncodingError;

use std::fmt::{self, Write};
use std::panic::Location;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use error_location::ErrorLocation;
use ls_config::{ErrorCorrection, MAX_PAIRING_MARGIN, MAX_PAIRING_WIDTH, PairingConfig};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};

const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// sRGB color with alpha, parsed from `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn opacity(&self) -> String {
        let value = f64::from(self.a) / 255.0;
        let mut text = format!("{value:.3}");
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
        text
    }
}

impl FromStr for Rgba {
    type Err = EncodingError;

    #[track_caller]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let location = Location::caller();
        let invalid = || EncodingError::InvalidRenderOptions {
            message: format!("'{s}' is not a #rgb, #rrggbb or #rrggbbaa color"),
            location: ErrorLocation::from(location),
        };

        let digits = s.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16);
        let short = |index: usize| channel(index..index + 1).map(|v| v * 17);

        let parsed = match digits.len() {
            3 => (short(0), short(1), short(2), Ok(0xff)),
            6 => (channel(0..2), channel(2..4), channel(4..6), Ok(0xff)),
            8 => (channel(0..2), channel(2..4), channel(4..6), channel(6..8)),
            _ => return Err(invalid()),
        };

        match parsed {
            (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Self { r, g, b, a }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// Per-call overrides; unset fields take the `[pairing]` defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Quiet zone in modules.
    pub margin: Option<u32>,
    /// Rendered edge length in pixels.
    pub width: Option<u32>,
    pub dark: Option<String>,
    pub light: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingImage {
    data_uri: String,
    #[serde(skip)]
    svg: String,
    width: u32,
    modules: u32,
}

impl PairingImage {
    /// `data:image/svg+xml;base64,...`
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// QR symbol size in modules, without the quiet zone.
    pub fn modules(&self) -> u32 {
        self.modules
    }
}

struct ResolvedOptions {
    margin: u32,
    width: u32,
    dark: Rgba,
    light: Rgba,
}

/// Turns a pairing payload (usually the server address) into a QR image.
#[derive(Debug, Clone, Default)]
pub struct PairingCodeGenerator {
    defaults: PairingConfig,
}

impl PairingCodeGenerator {
    pub fn new(defaults: PairingConfig) -> Self {
        Self { defaults }
    }

    /// Encode `text` (absent means empty) and render it as an SVG data URI.
    #[track_caller]
    pub fn generate(
        &self,
        text: Option<&str>,
        options: &RenderOptions,
    ) -> Result<PairingImage, EncodingError> {
        let text = text.unwrap_or_default();
        let resolved = self.resolve(options)?;
        let code = self.encode(text)?;
        let svg = render_svg(&code, &resolved);

        log::debug!(
            "Rendered pairing image: {} bytes of text, {} modules, {}px",
            text.len(),
            code.width(),
            resolved.width
        );

        Ok(PairingImage {
            data_uri: format!("{SVG_DATA_URI_PREFIX}{}", STANDARD.encode(svg.as_bytes())),
            svg,
            width: resolved.width,
            modules: code.width() as u32,
        })
    }

    #[track_caller]
    fn encode(&self, text: &str) -> Result<QrCode, EncodingError> {
        let location = Location::caller();
        let level = self.defaults.error_correction;
        QrCode::with_error_correction_level(text.as_bytes(), ec_level(level)).map_err(|e| match e {
            QrError::DataTooLong => EncodingError::CapacityExceeded {
                length: text.len(),
                level,
                location: ErrorLocation::from(location),
            },
            other => EncodingError::Unencodable {
                message: other.to_string(),
                location: ErrorLocation::from(location),
            },
        })
    }

    fn resolve(&self, options: &RenderOptions) -> Result<ResolvedOptions, EncodingError> {
        let width = options.width.unwrap_or(self.defaults.width);
        if width == 0 || width > MAX_PAIRING_WIDTH {
            return Err(EncodingError::invalid_options(format!(
                "width must be 1-{MAX_PAIRING_WIDTH} pixels, got {width}"
            )));
        }

        let margin = options.margin.unwrap_or(self.defaults.margin);
        if margin > MAX_PAIRING_MARGIN {
            return Err(EncodingError::invalid_options(format!(
                "margin must be 0-{MAX_PAIRING_MARGIN} modules, got {margin}"
            )));
        }

        let dark = options
            .dark
            .as_deref()
            .unwrap_or(&self.defaults.dark)
            .parse::<Rgba>()?;
        let light = options
            .light
            .as_deref()
            .unwrap_or(&self.defaults.light)
            .parse::<Rgba>()?;

        Ok(ResolvedOptions {
            margin,
            width,
            dark,
            light,
        })
    }
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::L => EcLevel::L,
        ErrorCorrection::M => EcLevel::M,
        ErrorCorrection::Q => EcLevel::Q,
        ErrorCorrection::H => EcLevel::H,
    }
}

/// One unit in the viewBox per module; the quiet zone is part of the canvas.
fn render_svg(code: &QrCode, options: &ResolvedOptions) -> String {
    let modules = code.width();
    let margin = options.margin as usize;
    let size = modules + 2 * margin;

    let mut path = String::new();
    for (index, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            let x = index % modules + margin;
            let y = index / modules + margin;
            // Writing into a String cannot fail.
            let _ = write!(path, "M{x} {y}h1v1h-1z");
        }
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" "#,
            r#"width="{width}" height="{width}" viewBox="0 0 {size} {size}" shape-rendering="crispEdges">"#,
            r#"<rect width="{size}" height="{size}" fill="{light}" fill-opacity="{light_opacity}"/>"#,
            r#"<path d="{path}" fill="{dark}" fill-opacity="{dark_opacity}"/>"#,
            "</svg>"
        ),
        width = options.width,
        size = size,
        light = options.light.hex(),
        light_opacity = options.light.opacity(),
        path = path,
        dark = options.dark.hex(),
        dark_opacity = options.dark.opacity(),
    )
}

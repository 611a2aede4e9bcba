use std::fs;
use std::path::{Path, PathBuf};

use bon::Builder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Size limits shared by every circular instrument.
///
/// One instance is built at startup and handed to each dial behind an `Arc`,
/// so the limits live in exactly one place.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct InstrumentGeometry {
    /// Smallest widget edge, in pixels.
    #[builder(default = 200)]
    pub min_size: i32,
    /// Largest widget edge, in pixels.
    #[builder(default = 600)]
    pub max_size: i32,
    /// Gap kept between the widget edge and the dial rim.
    #[builder(default = 2)]
    pub edge_offset: i32,
}

impl Default for InstrumentGeometry {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the demo window
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub max_framerate: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Demo of Flight Instruments".to_string(),
            width: 800,
            height: 600,
            max_framerate: 60.0,
        }
    }
}

/// Configuration for instrument sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstrumentsConfig {
    pub min_size: i32,
    pub max_size: i32,
    pub edge_offset: i32,
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        let geometry = InstrumentGeometry::default();
        Self {
            min_size: geometry.min_size,
            max_size: geometry.max_size,
            edge_offset: geometry.edge_offset,
        }
    }
}

/// Repairs limits that could not produce a dial: `min_size` is at least 1,
/// `max_size` at least `min_size`, and the edge offset leaves a dial of at
/// least one pixel at the minimum size.
impl From<&InstrumentsConfig> for InstrumentGeometry {
    fn from(config: &InstrumentsConfig) -> Self {
        let min_size = config.min_size.max(1);
        let max_size = config.max_size.max(min_size);
        let edge_offset = config.edge_offset.clamp(0, (min_size - 1) / 2);

        if (min_size, max_size, edge_offset)
            != (config.min_size, config.max_size, config.edge_offset)
        {
            warn!(
                min_size,
                max_size,
                edge_offset,
                "instrument limits in config repaired"
            );
        }

        InstrumentGeometry::builder()
            .min_size(min_size)
            .max_size(max_size)
            .edge_offset(edge_offset)
            .build()
    }
}

/// Configuration for keyboard input
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Increment applied per key press.
    pub step: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { step: 1.0 }
    }
}

/// Configuration for fonts and text rendering
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// TTF/OTF file used for every label. When unset, a few common system
    /// locations are tried.
    pub path: Option<PathBuf>,
}

/// Configuration for the simulated sensor feed
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Amplitude of the per-sample noise added on top of the random walk.
    pub jitter: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 50,
            jitter: 0.03,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Main configuration struct, read from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub instruments: InstrumentsConfig,
    pub input: InputConfig,
    pub font: FontConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse a config from TOML text. Missing sections and keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            info!(path = %path.display(), "loaded config");
            Ok(config)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn geometry(&self) -> InstrumentGeometry {
        InstrumentGeometry::from(&self.instruments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn geometry_defaults_match_widget_limits() {
        let geometry = InstrumentGeometry::default();
        assert_eq!(geometry.min_size, 200);
        assert_eq!(geometry.max_size, 600);
        assert_eq!(geometry.edge_offset, 2);
    }

    #[test]
    fn builder_overrides_single_field() {
        let geometry = InstrumentGeometry::builder().edge_offset(5).build();
        assert_eq!(geometry.edge_offset, 5);
        assert_eq!(geometry.min_size, 200);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [window]
            width = 1024

            [input]
            step = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.input.step, 0.5);
        assert_eq!(config.logging.filter, "info");
        assert!(!config.feed.enabled);
    }

    #[test]
    fn empty_toml_is_default() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.geometry(), InstrumentGeometry::default());
        assert!(config.font.path.is_none());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(AppConfig::from_toml_str("[window\nwidth = ").is_err());
    }

    #[test]
    fn inverted_limits_are_repaired() {
        let config = AppConfig::from_toml_str(
            r#"
            [instruments]
            min_size = 300
            max_size = 100
            "#,
        )
        .unwrap();
        let geometry = config.geometry();
        assert_eq!(geometry.max_size, 300);
    }

    #[test]
    fn oversized_edge_offset_is_repaired() {
        let config = AppConfig::from_toml_str(
            r#"
            [instruments]
            min_size = 4
            max_size = 4
            edge_offset = 5
            "#,
        )
        .unwrap();
        let geometry = config.geometry();
        assert_eq!(geometry.edge_offset, 1);
        assert!(geometry.min_size - 2 * geometry.edge_offset > 0);
    }

    #[test]
    fn non_positive_limits_are_repaired() {
        let config = AppConfig::from_toml_str(
            r#"
            [instruments]
            min_size = -10
            max_size = 0
            edge_offset = -3
            "#,
        )
        .unwrap();
        let geometry = config.geometry();
        assert_eq!(
            (geometry.min_size, geometry.max_size, geometry.edge_offset),
            (1, 1, 0)
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default("/nonexistent/flight-instruments.toml").unwrap();
        assert_eq!(config.window.title, "Demo of Flight Instruments");
    }
}

//! Configuration for the geometry core
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats, stored by default in the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Transform settings (scale limits, stability rule, initial DPR)
//! - Migration settings (fallback normalization reference)
//! - Placement settings (persistence-guard probe and tolerance)

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use labelkit_core::constants;
use labelkit_core::{Point, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config dir
const APP_DIR: &str = "labelkit";

/// Default config file name
const CONFIG_FILE: &str = "config.toml";

/// View transform limits and stability rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Smallest accepted scale
    pub min_scale: f64,
    /// Largest accepted scale
    pub max_scale: f64,
    /// Unchanged transform hashes needed before the session is Stable
    pub stable_ticks_required: u32,
    /// Device pixel ratio assumed until the host reports one
    pub initial_dpr: f64,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            min_scale: constants::MIN_SCALE,
            max_scale: constants::MAX_SCALE,
            stable_ticks_required: constants::STABLE_TICKS_REQUIRED,
            initial_dpr: 1.0,
        }
    }
}

/// Legacy offset migration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Reference used when an offset must be normalized without a known
    /// natural image size
    pub default_reference: Size,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            default_reference: Size::default_reference(),
        }
    }
}

/// Persistence guard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Image-space point round-tripped by the persistence guard
    pub roundtrip_probe: Point,
    /// Maximum tolerated round-trip error in CSS pixels
    pub roundtrip_tolerance_css: f64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        let (x, y) = constants::ROUNDTRIP_PROBE;
        Self {
            roundtrip_probe: Point::new(x, y),
            roundtrip_tolerance_css: constants::ROUNDTRIP_TOLERANCE_CSS,
        }
    }
}

/// Complete geometry configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// View transform settings
    pub transform: TransformSettings,
    /// Migration settings
    pub migration: MigrationSettings,
    /// Placement and persistence settings
    pub placement: PlacementSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match extension_of(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension_of(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                )
                .into())
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Load from an explicit path, else from the default location if a file
    /// exists there, else fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        match default_config_path() {
            Ok(default_path) if default_path.exists() => Self::load_from_file(&default_path),
            Ok(_) => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => {
                tracing::debug!("Config directory unavailable ({}), using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let t = &self.transform;
        if !(t.min_scale.is_finite() && t.min_scale > 0.0) {
            return Err(ConfigError::out_of_range("transform.min_scale", t.min_scale));
        }
        if !(t.max_scale.is_finite() && t.max_scale >= t.min_scale) {
            return Err(ConfigError::out_of_range("transform.max_scale", t.max_scale));
        }
        if t.stable_ticks_required == 0 {
            return Err(ConfigError::out_of_range(
                "transform.stable_ticks_required",
                t.stable_ticks_required,
            ));
        }
        if !(t.initial_dpr.is_finite() && t.initial_dpr > 0.0) {
            return Err(ConfigError::out_of_range("transform.initial_dpr", t.initial_dpr));
        }

        if !self.migration.default_reference.is_usable() {
            return Err(ConfigError::out_of_range(
                "migration.default_reference",
                self.migration.default_reference,
            ));
        }

        let p = &self.placement;
        if !p.roundtrip_probe.is_finite() {
            return Err(ConfigError::out_of_range(
                "placement.roundtrip_probe",
                p.roundtrip_probe,
            ));
        }
        if !(p.roundtrip_tolerance_css.is_finite() && p.roundtrip_tolerance_css >= 0.0) {
            return Err(ConfigError::out_of_range(
                "placement.roundtrip_tolerance_css",
                p.roundtrip_tolerance_css,
            ));
        }

        Ok(())
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Platform config directory for LabelKit
pub fn config_dir() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| {
            ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string()).into()
        })
}

/// Default config file location
pub fn default_config_path() -> SettingsResult<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

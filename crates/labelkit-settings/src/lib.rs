//! LabelKit Settings Crate
//!
//! Handles configuration of the geometry core: transform limits, session
//! stability rules, migration defaults, and persistence-guard tolerances.

pub mod config;
pub mod error;

pub use config::{
    config_dir, default_config_path, Config, MigrationSettings, PlacementSettings,
    TransformSettings,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

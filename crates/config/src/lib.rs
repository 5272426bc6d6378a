//! Tilawa settings
//!
//! One TOML file with four tables: `[app]`, `[playback]`, `[sources]` and
//! `[scroll]`. Every table is optional and every field has a default, so a
//! partial file is fine. Out-of-range values are logged when loading and
//! rejected when saving.
//!
//! ```rust,no_run
//! use tilawa_config::ConfigManager;
//!
//! # fn main() -> Result<(), tilawa_config::ConfigError> {
//! let manager = ConfigManager::new()?;
//! let config = manager.load_or_default();
//! println!("Narrator: {}", config.playback.default_narrator);
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Sections
mod app_config;
mod playback_config;
mod scroll_config;
mod source_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use playback_config::PlaybackConfig;
pub use scroll_config::ScrollConfig;
pub use source_config::SourceConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Narrator selection and playback policy
    pub playback: PlaybackConfig,

    /// Remote audio source locations
    pub sources: SourceConfig,

    /// Scroll synchronization
    pub scroll: ScrollConfig,
}

impl Config {
    /// Every invalid field, across all sections
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.playback.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.sources.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.scroll.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Takes every section from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.playback.merge(other.playback);
        self.sources.merge(other.sources);
        self.scroll.merge(other.scroll);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            playback: PlaybackConfig::default(),
            sources: SourceConfig::default(),
            scroll: ScrollConfig::default(),
        }
    }
}

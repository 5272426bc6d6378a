//! Locating, loading and saving the Tilawa config file

use crate::persistence;
use crate::{Config, ConfigError, ConfigResult, LogLevel};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const FILE_NAME: &str = "config.toml";

/// Entry point for the config file: `<config dir>/tilawa/config.toml`
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Uses the platform config directory
    /// (`~/.config/tilawa` on Linux, `%APPDATA%\tilawa` on Windows).
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "tilawa").ok_or_else(|| {
            ConfigError::PathResolutionError {
                reason: "no home directory for the current user".to_string(),
            }
        })?;
        Ok(Self::with_directory(dirs.config_dir()))
    }

    /// Uses `config.toml` inside `dir`
    pub fn with_directory(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ConfigResult<Config> {
        persistence::read(&self.path)
    }

    /// Like [`load`](Self::load), but a damaged file falls back to defaults
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            log::warn!("{}; continuing with default settings", e);
            Config::default()
        })
    }

    /// Validates and atomically writes `config`
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        persistence::write(&self.path, config)
    }

    /// Writes the defaults unless a config file is already present
    ///
    /// Returns whether a file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&Config::default())?;
        log::info!("Created default config at {}", self.path.display());
        Ok(true)
    }

    /// Overwrites the file with the defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Problems found in the file on disk, one message per invalid field
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let problems = match self.load()?.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        };
        Ok(problems)
    }

    /// Loads the config and applies `TILAWA_*` environment overrides
    ///
    /// Recognised: `TILAWA_PLAYBACK_DEFAULT_NARRATOR`, `TILAWA_SOURCES_BITRATE`,
    /// `TILAWA_SOURCES_CDN_BASE`, `TILAWA_APP_LOG_LEVEL`. Unparseable values
    /// are ignored with a warning.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

/// Applies overrides looked up through `lookup`
fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(narrator) = lookup("TILAWA_PLAYBACK_DEFAULT_NARRATOR") {
        config.playback.default_narrator = narrator;
    }

    if let Some(bitrate) = lookup("TILAWA_SOURCES_BITRATE") {
        match bitrate.parse::<u32>() {
            Ok(b) => config.sources.bitrate = b,
            Err(_) => log::warn!("Ignoring TILAWA_SOURCES_BITRATE={}", bitrate),
        }
    }

    if let Some(cdn) = lookup("TILAWA_SOURCES_CDN_BASE") {
        config.sources.cdn_base = cdn;
    }

    if let Some(level) = lookup("TILAWA_APP_LOG_LEVEL") {
        match level.parse::<LogLevel>() {
            Ok(l) => config.app.log_level = l,
            Err(e) => log::warn!("Ignoring TILAWA_APP_LOG_LEVEL: {}", e),
        }
    }
}

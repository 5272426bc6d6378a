//! Reading and writing `config.toml`

use crate::{Config, ConfigError, ConfigResult, ValidationError, CONFIG_VERSION};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads the config at `path`
///
/// A missing file yields the defaults. An empty file is treated as damaged
/// and reported as a read error. Invalid values are kept and logged.
pub(crate) fn read(path: &Path) -> ConfigResult<Config> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: std::io::Error::new(ErrorKind::InvalidData, "config file is empty"),
        });
    }

    let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })?;

    if config.version > CONFIG_VERSION {
        log::warn!(
            "{} has format version {}, this build understands {}",
            path.display(),
            config.version,
            CONFIG_VERSION
        );
    }
    if let Err(errors) = config.validate() {
        log::warn!("Invalid values in {}: {}", path.display(), describe(&errors));
    }

    Ok(config)
}

/// Validates `config` and replaces the file at `path` in one rename
///
/// The file is either the old content or the new content, never a partial
/// write. Parent directories are created as needed.
pub(crate) fn write(path: &Path, config: &Config) -> ConfigResult<()> {
    config
        .validate()
        .map_err(|errors| ConfigError::ValidationError(describe(&errors)))?;

    let dir = path.parent().ok_or_else(|| ConfigError::PathResolutionError {
        reason: format!("{} has no parent directory", path.display()),
    })?;
    fs::create_dir_all(dir).map_err(|source| ConfigError::DirectoryCreationError {
        path: dir.to_path_buf(),
        source,
    })?;

    let rendered = toml::to_string_pretty(config)?;
    let write_error = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
    staged
        .write_all(rendered.as_bytes())
        .and_then(|()| staged.flush())
        .map_err(write_error)?;
    staged.persist(path).map_err(|e| write_error(e.error))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join("config.toml")
    }

    #[test]
    fn test_missing_file_reads_as_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(&config_in(&dir)).unwrap(), Config::default());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = config_in(&dir);

        let mut config = Config::default();
        config.playback.default_narrator = "minshawi".to_string();
        config.scroll.highlight_ms = 3_500;

        write(&path, &config).unwrap();
        assert_eq!(read(&path).unwrap(), config);
    }

    #[test]
    fn test_write_leaves_only_the_config_file() {
        let dir = TempDir::new().unwrap();
        let path = config_in(&dir);

        write(&path, &Config::default()).unwrap();
        write(&path, &Config::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("config.toml")]);
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write(&path, &Config::default()).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_invalid_config_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = config_in(&dir);

        let mut config = Config::default();
        config.sources.bitrate = 7;

        assert!(matches!(
            write(&path, &config),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = config_in(&dir);
        fs::write(&path, "[playback\nnarrator =").unwrap();

        assert!(matches!(read(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_blank_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = config_in(&dir);
        fs::write(&path, "  \n").unwrap();

        assert!(matches!(read(&path), Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_out_of_range_values_still_load() {
        let dir = TempDir::new().unwrap();
        let path = config_in(&dir);
        fs::write(&path, "[sources]\nbitrate = 7\n").unwrap();

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.sources.bitrate, 7);
        assert_eq!(loaded.playback.default_narrator, "alafasy");
    }
}

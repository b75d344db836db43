//! Configuration loading and saving

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::defaults::{APP_DIR_NAME, SETTINGS_FILE_NAME, TEMPLATES_FILE_NAME};
use super::types::Settings;

/// Why a settings document could not be loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the settings document.
///
/// A missing file is not an error and yields `Settings::default()`.
#[instrument(name = "load_settings")]
pub fn load_settings(path: &Path) -> Result<Settings, LoadError> {
    if !path.exists() {
        info!(path = %path.display(), "Settings file not found, using defaults");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded settings");
    Ok(settings)
}

/// Save the settings document durably.
///
/// The document is written to a sibling temp file, synced, then renamed over
/// the target, so a crash leaves either the old or the new file.
pub fn save_settings(path: &Path, settings: &Settings) -> io::Result<()> {
    let content = serde_json::to_string_pretty(settings).map_err(io::Error::other)?;
    write_atomically(path, content.as_bytes())
}

pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Directory holding settings, templates and logs.
pub fn data_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

pub fn default_settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE_NAME)
}

pub fn default_templates_path() -> PathBuf {
    data_dir().join(TEMPLATES_FILE_NAME)
}

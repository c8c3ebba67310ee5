use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::errors::{ParticipantsError, Result};

/// Name of the configuration file inside the per-user config directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the application directory under the user's config directory.
pub const APP_DIR: &str = "participants";

/// Settings that shape stable IDs and the identity file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantsConfig {
    /// Constant prefix of every stable ID.
    pub id_prefix: String,
    /// Zero-padded width of the numeric part of a stable ID.
    pub id_width: usize,
    /// Identifier type used for `replaced_by` redirects on merged-away records.
    pub tombstone_type: String,
    /// Spaces per nesting level in the saved identity file.
    pub indent: usize,
}

impl Default for ParticipantsConfig {
    fn default() -> Self {
        Self {
            id_prefix: "PID:".to_string(),
            id_width: 6,
            tombstone_type: "replaced_by".to_string(),
            indent: 3,
        }
    }
}

/// Returns the default configuration path, `<config dir>/participants/config.json`.
///
/// Returns `None` on platforms where no user config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

/// Loads the configuration from `path`.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config(path: &Path) -> Result<ParticipantsConfig> {
    if !path.exists() {
        return Ok(ParticipantsConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| ParticipantsError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    let config: ParticipantsConfig =
        serde_json::from_str(&contents).map_err(|e| ParticipantsError::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;

    validate_config(&config)?;
    Ok(config)
}

/// Saves the configuration to `path` using an atomic write.
pub fn save_config(path: &Path, config: &ParticipantsConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ParticipantsError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let json = serde_json::to_string_pretty(config).map_err(|e| ParticipantsError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| ParticipantsError::Config {
        message: format!(
            "failed to create temporary config file in '{}': {}",
            dir.display(),
            e
        ),
    })?;

    staged
        .write_all(json.as_bytes())
        .map_err(|e| ParticipantsError::Config {
            message: format!(
                "failed to write temporary config file '{}': {}",
                staged.path().display(),
                e
            ),
        })?;

    staged.persist(path).map_err(|e| ParticipantsError::Config {
        message: format!(
            "failed to move temporary config file to '{}': {}",
            path.display(),
            e.error
        ),
    })?;

    Ok(())
}

fn validate_config(config: &ParticipantsConfig) -> Result<()> {
    if config.id_width == 0 {
        return Err(ParticipantsError::Config {
            message: "id_width must be at least 1".to_string(),
        });
    }
    if config.tombstone_type.is_empty() {
        return Err(ParticipantsError::Config {
            message: "tombstone_type must not be empty".to_string(),
        });
    }
    Ok(())
}

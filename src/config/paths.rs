//! Path management for save-scummer
//!
//! ## Path Resolution Order
//!
//! 1. `SAVE_SCUMMER_DATA_DIR` environment variable (if set)
//! 2. The platform user data directory joined with `save-scummer`
//!    (`~/.local/share/save-scummer`, `%APPDATA%\save-scummer`, ...)

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::ScummerError;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "SAVE_SCUMMER_DATA_DIR";

const APP_DIR_NAME: &str = "save-scummer";

/// Manages all paths used by save-scummer
#[derive(Debug, Clone)]
pub struct ScummerPaths {
    /// Base directory for config, logs and default backups
    base_dir: PathBuf,
}

impl ScummerPaths {
    /// Create a new ScummerPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, ScummerError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) => PathBuf::from(custom),
            None => BaseDirs::new()
                .map(|dirs| dirs.data_dir().join(APP_DIR_NAME))
                .ok_or_else(|| {
                    ScummerError::Config("Could not determine user data directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Create ScummerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the path to the game store file
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the diagnostic log
    pub fn log_file(&self) -> PathBuf {
        self.base_dir.join("save-scummer.log")
    }

    /// Backup root used when the store doesn't override it
    pub fn default_backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), ScummerError> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            ScummerError::Io(format!(
                "Failed to create data directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_user(path: &str) -> PathBuf {
    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    if path == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"))
    {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }

    PathBuf::from(path)
}

/// Expand the user directory and make a path absolute, resolving symlinks
/// when the path exists
pub fn normalize_path(path: &str) -> PathBuf {
    let expanded = expand_user(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    };

    std::fs::canonicalize(&absolute).unwrap_or(absolute)
}

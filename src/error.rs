//! Custom error types for save-scummer
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. None of these errors are retried: every one
//! stems from user input or the state of the filesystem.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use thiserror::Error;

/// The main error type for save-scummer operations
#[derive(Error, Debug)]
pub enum ScummerError {
    /// The requested game title has no entry in the store
    #[error("Game not configured: {0}")]
    GameNotConfigured(String),

    /// Titles name a directory under the backup root
    #[error("Invalid game title '{0}': must be usable as a directory name")]
    InvalidTitle(String),

    /// The description would make a backup look like a pre-restore snapshot
    #[error("Backup description '{0}' is reserved for automatic pre-restore snapshots")]
    ReservedDescription(String),

    /// A source path or pattern matched no files
    #[error("No files are in the specified path: {0}")]
    EmptySelection(String),

    /// A glob pattern could not be compiled
    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Archives are immutable; an existing one is never overwritten
    #[error("Backup already exists: {}", .0.display())]
    ArchiveCollision(PathBuf),

    /// Backup archive not found on disk
    #[error("Backup not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    /// The archive exists but cannot be read as a zip container
    #[error("Corrupt backup archive {}: {reason}", .path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    /// Restore index outside of the available backups
    #[error("Backup index {index} is out of range ({available} backups available)")]
    IndexOutOfRange { index: i64, available: usize },

    /// Unparseable relative age, e.g. "2 fortnights"
    #[error("Invalid age expression: '{0}'")]
    InvalidAgeExpression(String),

    /// Unparseable absolute date/time
    #[error("Invalid date expression: '{0}'")]
    InvalidDateExpression(String),

    /// Every backup was saved after the requested point in time
    #[error("No backups found saved on or before {}", .0.format("%Y-%m-%d %H:%M:%S"))]
    NoBackupBeforeTarget(DateTime<Local>),

    /// The backup directory holds no restorable archives
    #[error("No backups available in {}", .0.display())]
    NoBackupsAvailable(PathBuf),

    /// Configuration store errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl ScummerError {
    /// Check if this error means something the user asked for doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GameNotConfigured(_)
                | Self::ArchiveNotFound(_)
                | Self::NoBackupsAvailable(_)
                | Self::NoBackupBeforeTarget(_)
        )
    }

    /// Check if this error was caused by a malformed argument
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidTitle(_)
                | Self::ReservedDescription(_)
                | Self::InvalidPattern { .. }
                | Self::IndexOutOfRange { .. }
                | Self::InvalidAgeExpression(_)
                | Self::InvalidDateExpression(_)
        )
    }
}

impl From<std::io::Error> for ScummerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ScummerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for save-scummer operations
pub type ScummerResult<T> = Result<T, ScummerError>;

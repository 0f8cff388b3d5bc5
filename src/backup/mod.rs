//! Backup and restore of game saves
//!
//! # Architecture
//!
//! - `selection`: expands a game's source spec into the files to archive
//! - `timestamp`: save times, archive name timestamps, age/date expressions
//! - `archive`: writes and extracts zip archives
//! - `catalog`: lists a game's archives and resolves restore specifiers
//! - `BackupManager`: archives a game and records its save metadata
//! - `RestoreManager`: snapshots current saves, then restores an archive
//!
//! # Archive Format
//!
//! Each backup is a deflate-compressed zip in `<backup root>/<title>/`,
//! named `<title>-<save time>[-<description>].zip` where the save time is
//! the newest modification time among the archived files, formatted as
//! `YYYYMMDDTHHMMSS`. Member paths are relative to the source's base
//! directory. Pre-restore snapshots are named
//! `<title>-<restore time>-pre-restore.zip` instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::Local;
//! use save_scummer::backup::{BackupManager, RestoreManager, RestoreSpecifier};
//! use save_scummer::config::{GameStore, ScummerPaths};
//!
//! let mut store = GameStore::load(ScummerPaths::new()?)?;
//! let result = BackupManager::new(&mut store).create_backup("game1", None)?;
//! store.save()?;
//! println!("{}", result.summary());
//!
//! // Later, roll back to the save from two days ago
//! let specifier = RestoreSpecifier::Age(chrono::Duration::days(2));
//! let restored = RestoreManager::new(&store).restore("game1", &specifier, Local::now())?;
//! println!("{}", restored.summary());
//! ```

pub mod archive;
pub mod catalog;
mod manager;
mod restore;
pub mod selection;
pub mod timestamp;

pub use catalog::{BackupCatalog, BackupInfo, RestoreOptions, RestoreSpecifier};
pub use manager::{archive_files, snapshot_files, BackupManager, BackupResult};
pub use restore::{RestoreManager, RestoreResult, RestoreStage};
pub use selection::{resolve_included_files, IncludedFile, SourceKind, SourceSelection};

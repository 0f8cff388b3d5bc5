//! Save Scummer - save game backup and restore
//!
//! This library provides the core functionality for the `ssc` command line
//! tool. Each configured game has a source (a save directory, file or glob
//! pattern) whose files are archived into timestamped zip files, and any of
//! those archives can later be restored over the game's saves.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Data directory paths and the persisted game store
//! - `error`: Custom error types
//! - `backup`: Source resolution, archiving, backup catalog and restore
//! - `display`: Table and detail formatting for terminal output
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use save_scummer::backup::BackupManager;
//! use save_scummer::config::{GameStore, ScummerPaths};
//!
//! let mut store = GameStore::load(ScummerPaths::new()?)?;
//! store.add_game("game1", "~/Games/game1", false)?;
//! BackupManager::new(&mut store).create_backup("game1", Some("before the boss"))?;
//! store.save()?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;

pub use error::{ScummerError, ScummerResult};

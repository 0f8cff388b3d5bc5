//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup layer.

pub mod backup;
pub mod games;

pub use backup::{
    handle_backup_command, handle_restore_command, BackupArgs, BackupSummary, RestoreArgs,
};
pub use games::{handle_add_command, handle_config_command, handle_ls_command, AddArgs};

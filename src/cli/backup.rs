//! Backup CLI commands
//!
//! Implements `backup` and `restore`.

use chrono::{DateTime, Local};
use clap::{ArgGroup, Args};

use crate::backup::{BackupManager, RestoreManager, RestoreOptions};
use crate::config::GameStore;
use crate::error::ScummerResult;

/// Arguments for `ssc backup`
#[derive(Args)]
#[command(group(ArgGroup::new("games").required(true).args(["titles", "all"])))]
pub struct BackupArgs {
    /// Titles of the games to back up
    pub titles: Vec<String>,

    /// Back up all configured games
    #[arg(short, long)]
    pub all: bool,

    /// Optional description for this backup
    #[arg(short, long)]
    pub description: Option<String>,
}

/// Arguments for `ssc restore`
///
/// With no options the newest backup is restored. Age and date compare
/// against when the game was saved, not when the backup was made.
#[derive(Args)]
pub struct RestoreArgs {
    /// Game title
    pub title: String,

    /// Backup filename; either absolute or relative to the backup directory
    #[arg(short = 'f', long = "file")]
    pub filename: Option<String>,

    /// Backup number, from 0 (newest) up; negative numbers count from the oldest
    #[arg(short, long, allow_negative_numbers = true)]
    pub index: Option<i64>,

    /// Minimum age of the save, e.g. '2d', '1:30', '1 hour and 5 minutes'
    #[arg(short, long)]
    pub age: Option<String>,

    /// Latest date/time of the save, e.g. '2021-01-20', '1/20/2021 4:30pm'
    #[arg(short, long)]
    pub date: Option<String>,
}

impl RestoreArgs {
    fn options(&self) -> RestoreOptions {
        RestoreOptions {
            filename: self.filename.clone(),
            index: self.index,
            age: self.age.clone(),
            date: self.date.clone(),
        }
    }
}

/// Outcome of a multi-game backup
#[derive(Debug, Default)]
pub struct BackupSummary {
    pub succeeded: usize,
    pub failed: Vec<String>,
}

impl BackupSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Handle `ssc backup`
///
/// Every requested game is attempted; a failure is reported and the rest
/// still run. The store is updated in memory for the caller to save.
pub fn handle_backup_command(
    store: &mut GameStore,
    args: BackupArgs,
) -> ScummerResult<BackupSummary> {
    let titles = if args.all { store.titles() } else { args.titles };
    if titles.is_empty() {
        println!("No games configured.");
        println!("Add one with: ssc add <title> <source>");
        return Ok(BackupSummary::default());
    }

    let mut summary = BackupSummary::default();
    let mut manager = BackupManager::new(store);
    for title in titles {
        match manager.create_backup(&title, args.description.as_deref()) {
            Ok(result) => {
                println!("{}: {}", title, result.summary());
                summary.succeeded += 1;
            }
            Err(e) => {
                tracing::error!(%title, error = %e, "backup failed");
                eprintln!("{}: Error: {}", title, e);
                summary.failed.push(title);
            }
        }
    }

    Ok(summary)
}

/// Handle `ssc restore`
pub fn handle_restore_command(
    store: &GameStore,
    args: RestoreArgs,
    now: DateTime<Local>,
) -> ScummerResult<()> {
    let options = args.options();
    let ignored = options.ignored();
    if !ignored.is_empty() {
        let ignored = ignored.join(", ");
        tracing::warn!(title = %args.title, %ignored, "restore options ignored");
        eprintln!(
            "WARNING: Only one of --file, --index, --age or --date is used; ignoring: {}",
            ignored
        );
    }

    let specifier = options.specifier(now)?;
    let result = RestoreManager::new(store).restore(&args.title, &specifier, now)?;
    println!("{}", result.summary());
    Ok(())
}

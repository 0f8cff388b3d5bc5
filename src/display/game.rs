//! Game display formatting
//!
//! Formats configured games and their backups for terminal output in table
//! and detail views.

use chrono::{DateTime, Local};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::format::{format_size, format_timestamp};
use crate::backup::BackupCatalog;
use crate::config::{GameEntry, GameStore};
use crate::error::ScummerResult;

/// One row of the game table
#[derive(Tabled)]
struct GameRow {
    #[tabled(rename = "Game")]
    title: String,
    #[tabled(rename = "Total backups")]
    total_backups: String,
    #[tabled(rename = "Last saved")]
    last_saved: String,
    #[tabled(rename = "Last backed up")]
    last_backed_up: String,
}

impl GameRow {
    fn new(
        store: &GameStore,
        title: &str,
        entry: &GameEntry,
        now: DateTime<Local>,
    ) -> ScummerResult<Self> {
        Ok(Self {
            title: title.to_string(),
            total_backups: backup_totals(store, title)?,
            last_saved: format_timestamp(entry.last_save_time, now),
            last_backed_up: format_timestamp(entry.last_backup_time, now),
        })
    }
}

/// Backup count and on-disk size, e.g. "3 (1.2 MB)"
fn backup_totals(store: &GameStore, title: &str) -> ScummerResult<String> {
    let (_, backup_dir) = store.get_game_dirs(title)?;
    let catalog = BackupCatalog::new(backup_dir);
    let count = catalog.list_backups()?.len();
    Ok(format!("{} ({})", count, format_size(catalog.total_size()?)))
}

/// Format all configured games as a table
pub fn format_game_list(store: &GameStore, now: DateTime<Local>) -> ScummerResult<String> {
    if store.is_empty() {
        return Ok(
            "No games configured.\nAdd one with: ssc add <title> <source>".to_string(),
        );
    }

    let rows = store
        .games()
        .map(|(title, entry)| GameRow::new(store, title, entry, now))
        .collect::<ScummerResult<Vec<_>>>()?;

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    Ok(table.to_string())
}

/// Format one game with its source, settings and individual backups
///
/// Restorable backups are numbered with the index `ssc restore -i` accepts.
pub fn format_game_details(
    store: &GameStore,
    title: &str,
    now: DateTime<Local>,
) -> ScummerResult<String> {
    let entry = store.get_game(title)?;
    let (_, backup_dir) = store.get_game_dirs(title)?;
    let catalog = BackupCatalog::new(backup_dir);
    let restorable = catalog.list_restorable()?;
    let snapshots = catalog.list_safety_snapshots()?;

    let mut output = String::new();
    output.push_str(&format!("Game:             {}\n", title));
    output.push_str(&format!("Source:           {}\n", entry.source));
    output.push_str(&format!(
        "Backup directory: {}\n",
        catalog.backup_dir().display()
    ));
    output.push_str(&format!(
        "Clean restore:    {}\n",
        if entry.clean_restore { "yes" } else { "no" }
    ));
    output.push_str(&format!("Total backups:    {}\n", backup_totals(store, title)?));
    output.push_str(&format!(
        "Last saved:       {}\n",
        format_timestamp(entry.last_save_time, now)
    ));
    output.push_str(&format!(
        "Last backed up:   {}\n",
        format_timestamp(entry.last_backup_time, now)
    ));

    output.push('\n');
    if restorable.is_empty() {
        output.push_str("No backups yet.\n");
    } else {
        output.push_str("Backups (newest first):\n");
        let width = restorable.len().saturating_sub(1).to_string().len();
        for (i, backup) in restorable.iter().enumerate() {
            output.push_str(&format!(
                "  {:>width$}: {} ({})\n",
                i,
                backup.filename,
                format_size(backup.size_bytes),
                width = width,
            ));
        }
    }

    if !snapshots.is_empty() {
        output.push_str("\nSafety snapshots (restore with -f):\n");
        for snapshot in &snapshots {
            output.push_str(&format!(
                "  {} ({})\n",
                snapshot.filename,
                format_size(snapshot.size_bytes)
            ));
        }
    }

    Ok(output)
}

//! Backup restoration
//!
//! A restore runs through fixed stages and never goes back:
//!
//! `Resolving -> Snapshotting -> Cleaning (optional) -> Extracting -> Done`
//!
//! Nothing on disk changes while resolving. The current save files are
//! always archived as a safety snapshot before the source directory is
//! touched, so a failure or interrupt in a later stage leaves a way back.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use super::archive::{extract_archive, verify_archive};
use super::catalog::{BackupCatalog, RestoreSpecifier};
use super::manager::snapshot_files;
use super::selection::{IncludedFile, SourceKind, SourceSelection};
use crate::config::store::GameStore;
use crate::error::{ScummerError, ScummerResult};

/// Stage of a restore, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Resolving,
    Snapshotting,
    Cleaning,
    Extracting,
    Done,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Snapshotting => "snapshotting",
            Self::Cleaning => "cleaning",
            Self::Extracting => "extracting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a restore operation
#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// Archive that was restored
    pub archive_path: PathBuf,
    /// Directory the archive was extracted into
    pub destination: PathBuf,
    /// Snapshot of the save files that were replaced, if there were any
    pub safety_snapshot: Option<PathBuf>,
    /// Whether the current save files were deleted before extracting
    pub cleaned: bool,
    /// Number of files extracted
    pub files_restored: usize,
}

impl RestoreResult {
    pub fn summary(&self) -> String {
        let archive = file_name(&self.archive_path);
        let mut summary = format!(
            "Restored {} file(s) from {} to {}",
            self.files_restored,
            archive,
            self.destination.display()
        );
        match &self.safety_snapshot {
            Some(snapshot) => {
                summary.push_str(&format!("\nPrevious saves backed up to {}", file_name(snapshot)))
            }
            None => summary.push_str("\nNo previous saves to back up"),
        }
        summary
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handles restoring games from their backups
pub struct RestoreManager<'a> {
    store: &'a GameStore,
}

impl<'a> RestoreManager<'a> {
    pub fn new(store: &'a GameStore) -> Self {
        Self { store }
    }

    /// Restore a game from the backup picked by `specifier`
    pub fn restore(
        &self,
        title: &str,
        specifier: &RestoreSpecifier,
        now: DateTime<Local>,
    ) -> ScummerResult<RestoreResult> {
        let mut stage = RestoreStage::Resolving;
        let result = self.run(title, specifier, now, &mut stage);
        if let Err(e) = &result {
            tracing::error!(%title, %stage, error = %e, "restore failed");
        }
        result
    }

    fn run(
        &self,
        title: &str,
        specifier: &RestoreSpecifier,
        now: DateTime<Local>,
        stage: &mut RestoreStage,
    ) -> ScummerResult<RestoreResult> {
        let entry = self.store.get_game(title)?;
        let (_, backup_dir) = self.store.get_game_dirs(title)?;
        let catalog = BackupCatalog::new(&backup_dir);

        let archive_path = catalog.resolve(specifier, now)?;
        verify_archive(&archive_path)?;
        tracing::info!(%title, archive = %archive_path.display(), "restoring");

        let selection = entry.selection();
        let destination = selection.base_dir().to_path_buf();

        *stage = RestoreStage::Snapshotting;
        let current = match selection.resolve() {
            Ok(files) => files,
            Err(ScummerError::EmptySelection(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        let safety_snapshot = if current.is_empty() {
            tracing::info!(%title, "no current save files, skipping safety snapshot");
            None
        } else {
            Some(snapshot_files(title, &current, &backup_dir, now)?.archive_path)
        };

        let cleaned = entry.clean_restore && !current.is_empty();
        if cleaned {
            *stage = RestoreStage::Cleaning;
            remove_selected(&selection, &current)?;
        }

        *stage = RestoreStage::Extracting;
        fs::create_dir_all(&destination).map_err(|e| {
            ScummerError::Io(format!("Failed to create {}: {}", destination.display(), e))
        })?;
        let files_restored = extract_archive(&archive_path, &destination)?;

        *stage = RestoreStage::Done;
        Ok(RestoreResult {
            archive_path,
            destination,
            safety_snapshot,
            cleaned,
            files_restored,
        })
    }
}

/// Delete the files a selection currently matches
///
/// Files the source doesn't select are kept. For a directory source,
/// subdirectories left empty are removed too; the directory itself stays.
fn remove_selected(selection: &SourceSelection, files: &[IncludedFile]) -> ScummerResult<()> {
    let base_dir = selection.base_dir();
    for file in files {
        let path = base_dir.join(&file.relative);
        fs::remove_file(&path).map_err(|e| {
            ScummerError::Io(format!("Failed to delete {}: {}", path.display(), e))
        })?;
    }

    if selection.kind() == SourceKind::Directory {
        prune_empty_dirs(base_dir);
    }

    tracing::debug!(
        base_dir = %base_dir.display(),
        files = files.len(),
        "cleared before restore"
    );
    Ok(())
}

/// Remove empty directories below `root`, deepest first
fn prune_empty_dirs(root: &Path) {
    let dirs = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for dir in dirs {
        // Fails on directories that still hold something
        if fs::remove_dir(dir.path()).is_ok() {
            tracing::debug!(dir = %dir.path().display(), "removed empty directory");
        }
    }
}

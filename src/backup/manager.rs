//! Backup creation
//!
//! Archives a game's source files into its backup directory, named after the
//! time the newest file was saved, and records that time in the game store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::archive::write_archive;
use super::catalog::{archive_filename, is_snapshot_name, snapshot_filename};
use super::selection::IncludedFile;
use super::timestamp::latest_modified;
use crate::config::store::GameStore;
use crate::error::{ScummerError, ScummerResult};

/// Outcome of archiving a source selection
#[derive(Debug, Clone)]
pub struct BackupResult {
    /// Path to the new archive
    pub archive_path: PathBuf,
    /// Number of files archived
    pub file_count: usize,
    /// Uncompressed size of the archived files
    pub total_bytes: u64,
    /// Modification time of the newest archived file
    pub save_time: DateTime<Local>,
}

impl BackupResult {
    pub fn filename(&self) -> String {
        self.archive_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.archive_path.display().to_string())
    }

    pub fn summary(&self) -> String {
        format!(
            "Backed up {} file(s) saved at {} to {}",
            self.file_count,
            self.save_time.format("%Y-%m-%d %H:%M:%S"),
            self.filename()
        )
    }
}

/// Archive an already-resolved file selection into `backup_dir`, named
/// after its newest file
///
/// # Errors
///
/// `ReservedDescription` if the description would name the archive like a
/// pre-restore snapshot.
pub fn archive_files(
    title: &str,
    files: &[IncludedFile],
    backup_dir: &Path,
    description: Option<&str>,
) -> ScummerResult<BackupResult> {
    let save_time = save_time_of(files)?;
    let filename = archive_filename(title, &save_time, description);
    if let Some(description) = description.filter(|_| is_snapshot_name(&filename)) {
        return Err(ScummerError::ReservedDescription(description.to_string()));
    }

    write_backup(backup_dir.join(filename), files, save_time)
}

/// Archive the current save files before a restore replaces them
///
/// The snapshot is named after `taken_at`, when the restore ran.
pub fn snapshot_files(
    title: &str,
    files: &[IncludedFile],
    backup_dir: &Path,
    taken_at: DateTime<Local>,
) -> ScummerResult<BackupResult> {
    let save_time = save_time_of(files)?;
    let archive_path = backup_dir.join(snapshot_filename(title, &taken_at));
    write_backup(archive_path, files, save_time)
}

fn save_time_of(files: &[IncludedFile]) -> ScummerResult<DateTime<Local>> {
    let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
    latest_modified(&paths)
}

fn write_backup(
    archive_path: PathBuf,
    files: &[IncludedFile],
    save_time: DateTime<Local>,
) -> ScummerResult<BackupResult> {
    let total_bytes = write_archive(&archive_path, files)?;
    Ok(BackupResult {
        archive_path,
        file_count: files.len(),
        total_bytes,
        save_time,
    })
}

/// Creates backups of configured games
pub struct BackupManager<'a> {
    store: &'a mut GameStore,
}

impl<'a> BackupManager<'a> {
    pub fn new(store: &'a mut GameStore) -> Self {
        Self { store }
    }

    /// Create a backup of one game and record its save/backup times
    ///
    /// The store is updated in memory; the caller saves it.
    pub fn create_backup(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> ScummerResult<BackupResult> {
        let (source, backup_dir) = self.store.get_game_dirs(title)?;
        tracing::debug!(%title, %source, backup_dir = %backup_dir.display(), "creating backup");

        let files = self.store.get_game(title)?.selection().resolve()?;
        let result = archive_files(title, &files, &backup_dir, description)?;

        self.store
            .update_metadata(title, result.save_time, Local::now())?;

        tracing::info!(
            %title,
            archive = %result.archive_path.display(),
            files = result.file_count,
            "backup created"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::catalog::BackupCatalog;
    use crate::config::paths::ScummerPaths;
    use chrono::TimeZone;
    use std::fs::{self, File};
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: DateTime<Local>) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::from(time))
            .unwrap();
    }

    fn create_test_store() -> (GameStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("saves");
        fs::create_dir_all(source.join("slot1")).unwrap();
        fs::write(source.join("slot1/save.sav"), "level 10").unwrap();
        fs::write(source.join("options.ini"), "volume=3").unwrap();
        set_mtime(
            &source.join("slot1/save.sav"),
            Local.with_ymd_and_hms(2021, 1, 20, 0, 9, 10).unwrap(),
        );
        set_mtime(
            &source.join("options.ini"),
            Local.with_ymd_and_hms(2020, 12, 1, 8, 0, 0).unwrap(),
        );

        let paths = ScummerPaths::with_base_dir(temp.path().join("data"));
        let mut store = GameStore::load(paths).unwrap();
        store.add_game("game1", source.to_string_lossy(), false).unwrap();
        (store, temp)
    }

    #[test]
    fn test_create_backup() {
        let (mut store, temp) = create_test_store();

        let result = BackupManager::new(&mut store)
            .create_backup("game1", None)
            .unwrap();

        let expected_dir = temp.path().join("data/backups/game1");
        assert_eq!(result.archive_path, expected_dir.join("game1-20210120T000910.zip"));
        assert!(result.archive_path.exists());
        assert_eq!(result.file_count, 2);
        assert_eq!(
            result.save_time,
            Local.with_ymd_and_hms(2021, 1, 20, 0, 9, 10).unwrap()
        );
        assert!(result.summary().contains("Backed up 2 file(s)"));
    }

    #[test]
    fn test_backup_updates_metadata() {
        let (mut store, _temp) = create_test_store();
        let before = Local::now();

        let result = BackupManager::new(&mut store)
            .create_backup("game1", Some("first boss"))
            .unwrap();
        assert!(result.filename().ends_with("-first-boss.zip"));

        let entry = store.get_game("game1").unwrap();
        assert_eq!(entry.last_save_time, Some(result.save_time));
        assert!(entry.last_backup_time.unwrap() >= before);
    }

    #[test]
    fn test_unchanged_saves_collide() {
        let (mut store, _temp) = create_test_store();
        let mut manager = BackupManager::new(&mut store);

        let first = manager.create_backup("game1", None).unwrap();
        let before = fs::read(&first.archive_path).unwrap();

        let second = manager.create_backup("game1", None);
        assert!(matches!(second, Err(ScummerError::ArchiveCollision(p)) if p == first.archive_path));
        assert_eq!(fs::read(&first.archive_path).unwrap(), before);
    }

    #[test]
    fn test_backup_is_listed() {
        let (mut store, _temp) = create_test_store();
        let result = BackupManager::new(&mut store)
            .create_backup("game1", None)
            .unwrap();

        let (_, backup_dir) = store.get_game_dirs("game1").unwrap();
        let backups = BackupCatalog::new(backup_dir).list_restorable().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].path, result.archive_path);
        assert_eq!(backups[0].save_time, Some(result.save_time));
    }

    #[test]
    fn test_empty_source_fails() {
        let (mut store, temp) = create_test_store();
        let empty = temp.path().join("empty");
        fs::create_dir(&empty).unwrap();
        store.add_game("game2", empty.to_string_lossy(), false).unwrap();

        let result = BackupManager::new(&mut store).create_backup("game2", None);
        assert!(matches!(result, Err(ScummerError::EmptySelection(_))));
        assert!(store.get_game("game2").unwrap().last_backup_time.is_none());
    }

    #[test]
    fn test_snapshot_marker_reserved_for_descriptions() {
        let (mut store, _temp) = create_test_store();
        let mut manager = BackupManager::new(&mut store);

        let result = manager.create_backup("game1", Some("Pre Restore"));
        assert!(matches!(result, Err(ScummerError::ReservedDescription(d)) if d == "Pre Restore"));

        let result = manager.create_backup("game1", Some("boss pre restore")).unwrap();
        assert!(result.filename().ends_with("-boss-pre-restore.zip"));

        let (_, backup_dir) = store.get_game_dirs("game1").unwrap();
        let catalog = BackupCatalog::new(backup_dir);
        assert_eq!(catalog.list_restorable().unwrap().len(), 1);
        assert!(catalog.list_safety_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_named_after_restore_time() {
        let (store, temp) = create_test_store();
        let files = store.get_game("game1").unwrap().selection().resolve().unwrap();
        let backup_dir = temp.path().join("snapshots");
        let taken_at = Local.with_ymd_and_hms(2021, 2, 1, 18, 30, 0).unwrap();

        let first = snapshot_files("game1", &files, &backup_dir, taken_at).unwrap();
        assert_eq!(first.filename(), "game1-20210201T183000-pre-restore.zip");
        assert_eq!(
            first.save_time,
            Local.with_ymd_and_hms(2021, 1, 20, 0, 9, 10).unwrap()
        );

        // Same files, a second later
        let second =
            snapshot_files("game1", &files, &backup_dir, taken_at + chrono::Duration::seconds(1))
                .unwrap();
        assert_ne!(first.archive_path, second.archive_path);
    }

    #[test]
    fn test_single_file_source() {
        let (mut store, temp) = create_test_store();
        let file = temp.path().join("saves/options.ini");
        store.add_game("game2", file.to_string_lossy(), false).unwrap();

        let result = BackupManager::new(&mut store)
            .create_backup("game2", None)
            .unwrap();
        assert_eq!(result.file_count, 1);
        assert_eq!(result.filename(), "game2-20201201T080000.zip");
    }

    #[test]
    fn test_unknown_game() {
        let (mut store, _temp) = create_test_store();
        let result = BackupManager::new(&mut store).create_backup("nope", None);
        assert!(matches!(result, Err(ScummerError::GameNotConfigured(_))));
    }
}

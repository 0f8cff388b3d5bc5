//! Backup catalog
//!
//! Lists the archives in a game's backup directory and picks the one a
//! restore should use.
//!
//! # Restore specifiers
//!
//! Exactly one specifier is used. When several are given, the first in this
//! order wins and the rest are reported as ignored:
//!
//! 1. explicit filename (absolute, or relative to the backup directory)
//! 2. index into the restorable backups, newest first (`-1` is the oldest)
//! 3. minimum age of the save
//! 4. maximum date of the save
//! 5. nothing: the newest backup
//!
//! Age and date compare against the save time embedded in each archive's
//! name, i.e. when the backed up files were last modified, not when the
//! backup was made.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};

use super::archive::ARCHIVE_EXTENSION;
use super::timestamp::{
    find_archive_timestamp, format_archive_timestamp, parse_archive_timestamp, parse_date,
    parse_duration,
};
use crate::error::{ScummerError, ScummerResult};

/// Description reserved for the automatic snapshot taken before a restore
pub const SAFETY_SNAPSHOT_MARKER: &str = "pre-restore";

/// Metadata about a backup archive
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// Modification time of the archive file itself
    pub modified: DateTime<Local>,
    /// Save time parsed from the filename
    pub save_time: Option<DateTime<Local>>,
    /// Size in bytes
    pub size_bytes: u64,
}

impl BackupInfo {
    /// Whether this is an automatic pre-restore snapshot
    pub fn is_safety_snapshot(&self) -> bool {
        is_snapshot_name(&self.filename)
    }

    /// Save time for age/date selection
    ///
    /// Archives whose names carry no timestamp fall back to the file's
    /// modification time, which is when the backup was made rather than when
    /// the game was saved.
    pub fn effective_save_time(&self) -> DateTime<Local> {
        self.save_time.unwrap_or(self.modified)
    }
}

/// Which backup to restore
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreSpecifier {
    /// Explicit archive path, or filename relative to the backup directory
    Filename(PathBuf),
    /// Position among restorable backups, newest first; negative counts from the oldest
    Index(i64),
    /// Newest backup whose save is at least this old
    Age(Duration),
    /// Newest backup saved at or before this time
    Date(DateTime<Local>),
    /// Newest backup
    Latest,
}

/// Raw restore options as given on the command line
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub filename: Option<String>,
    pub index: Option<i64>,
    pub age: Option<String>,
    pub date: Option<String>,
}

impl RestoreOptions {
    /// Pick the highest-precedence specifier, parsing ages and dates
    pub fn specifier(&self, now: DateTime<Local>) -> ScummerResult<RestoreSpecifier> {
        if let Some(filename) = &self.filename {
            return Ok(RestoreSpecifier::Filename(PathBuf::from(filename)));
        }
        if let Some(index) = self.index {
            return Ok(RestoreSpecifier::Index(index));
        }
        if let Some(age) = &self.age {
            return Ok(RestoreSpecifier::Age(parse_duration(age)?));
        }
        if let Some(date) = &self.date {
            return Ok(RestoreSpecifier::Date(parse_date(date, now)?));
        }
        Ok(RestoreSpecifier::Latest)
    }

    /// Options that were given but lose to a higher-precedence one
    pub fn ignored(&self) -> Vec<&'static str> {
        let given = [
            ("filename", self.filename.is_some()),
            ("index", self.index.is_some()),
            ("age", self.age.is_some()),
            ("date", self.date.is_some()),
        ];
        given
            .iter()
            .filter(|(_, present)| *present)
            .skip(1)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Lowercase a title or description into a filename-safe slug
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Archive filename: `<title>-<save time>[-<description>].zip`
pub fn archive_filename(
    title: &str,
    save_time: &DateTime<Local>,
    description: Option<&str>,
) -> String {
    let mut title_slug = slugify(title);
    if title_slug.is_empty() {
        title_slug.push_str("backup");
    }

    let mut name = format!("{}-{}", title_slug, format_archive_timestamp(save_time));
    if let Some(description) = description.map(slugify).filter(|d| !d.is_empty()) {
        name.push('-');
        name.push_str(&description);
    }
    name.push('.');
    name.push_str(ARCHIVE_EXTENSION);
    name
}

/// Snapshot filename: `<title>-<time the restore ran>-pre-restore.zip`
pub fn snapshot_filename(title: &str, taken_at: &DateTime<Local>) -> String {
    archive_filename(title, taken_at, Some(SAFETY_SNAPSHOT_MARKER))
}

/// Whether an archive filename is a pre-restore snapshot
///
/// The marker must directly follow the timestamp; a backup described as
/// "boss pre restore" is an ordinary backup.
pub fn is_snapshot_name(filename: &str) -> bool {
    let Some(stem) = filename
        .strip_suffix(ARCHIVE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .and_then(|s| s.strip_suffix(SAFETY_SNAPSHOT_MARKER))
        .and_then(|s| s.strip_suffix('-'))
    else {
        return false;
    };

    [15, 19].iter().any(|len| {
        stem.len()
            .checked_sub(*len)
            .and_then(|start| stem.get(start..))
            .and_then(parse_archive_timestamp)
            .is_some()
    })
}

/// The backups of a single game
pub struct BackupCatalog {
    backup_dir: PathBuf,
}

impl BackupCatalog {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// List all archives in the backup directory, newest file first
    ///
    /// Ties on modification time are broken by filename, descending. A
    /// missing directory has no backups.
    pub fn list_backups(&self) -> ScummerResult<Vec<BackupInfo>> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.backup_dir).map_err(|e| {
            ScummerError::Io(format!(
                "Failed to read backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ScummerError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != ARCHIVE_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().map_err(|e| {
                ScummerError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            if !metadata.is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().into_owned();
            let modified = metadata
                .modified()
                .map(DateTime::<Local>::from)
                .map_err(|e| ScummerError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

            backups.push(BackupInfo {
                save_time: find_archive_timestamp(&filename),
                filename,
                path,
                modified,
                size_bytes: metadata.len(),
            });
        }

        backups.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.filename.cmp(&a.filename))
        });

        Ok(backups)
    }

    /// Backups that can be picked by index, age, date or default
    pub fn list_restorable(&self) -> ScummerResult<Vec<BackupInfo>> {
        let mut backups = self.list_backups()?;
        backups.retain(|b| !b.is_safety_snapshot());
        Ok(backups)
    }

    /// Automatic pre-restore snapshots, newest first
    pub fn list_safety_snapshots(&self) -> ScummerResult<Vec<BackupInfo>> {
        let mut backups = self.list_backups()?;
        backups.retain(BackupInfo::is_safety_snapshot);
        Ok(backups)
    }

    /// Total size of all archives in bytes
    pub fn total_size(&self) -> ScummerResult<u64> {
        Ok(self.list_backups()?.iter().map(|b| b.size_bytes).sum())
    }

    /// Resolve a restore specifier to one archive path
    ///
    /// Explicit filenames are not checked for existence here.
    pub fn resolve(
        &self,
        specifier: &RestoreSpecifier,
        now: DateTime<Local>,
    ) -> ScummerResult<PathBuf> {
        match specifier {
            RestoreSpecifier::Filename(path) => Ok(if path.is_absolute() {
                path.clone()
            } else {
                self.backup_dir.join(path)
            }),
            RestoreSpecifier::Index(index) => self.by_index(*index),
            RestoreSpecifier::Age(age) => {
                let target = now
                    .checked_sub_signed(*age)
                    .ok_or_else(|| ScummerError::InvalidAgeExpression(age.to_string()))?;
                self.saved_at_or_before(target)
            }
            RestoreSpecifier::Date(target) => self.saved_at_or_before(*target),
            RestoreSpecifier::Latest => self
                .list_restorable()?
                .into_iter()
                .next()
                .map(|b| b.path)
                .ok_or_else(|| ScummerError::NoBackupsAvailable(self.backup_dir.clone())),
        }
    }

    fn by_index(&self, index: i64) -> ScummerResult<PathBuf> {
        let backups = self.list_restorable()?;
        let available = backups.len();
        let out_of_range = || ScummerError::IndexOutOfRange { index, available };

        let position = if index >= 0 {
            usize::try_from(index).ok().filter(|&i| i < available)
        } else {
            usize::try_from(index.unsigned_abs())
                .ok()
                .and_then(|back| available.checked_sub(back))
        }
        .ok_or_else(out_of_range)?;

        backups
            .into_iter()
            .nth(position)
            .map(|b| b.path)
            .ok_or_else(out_of_range)
    }

    /// Newest restorable backup whose save time is at or before `target`
    fn saved_at_or_before(&self, target: DateTime<Local>) -> ScummerResult<PathBuf> {
        let mut backups = self.list_restorable()?;

        for backup in backups.iter().filter(|b| b.save_time.is_none()) {
            tracing::warn!(
                file = %backup.filename,
                "no save time in archive name, comparing against file modification time"
            );
        }

        backups.sort_by(|a, b| {
            b.effective_save_time()
                .cmp(&a.effective_save_time())
                .then_with(|| b.filename.cmp(&a.filename))
        });

        backups
            .into_iter()
            .find(|b| b.effective_save_time() <= target)
            .map(|b| b.path)
            .ok_or(ScummerError::NoBackupBeforeTarget(target))
    }
}

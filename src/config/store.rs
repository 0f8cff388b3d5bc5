//! Persisted game store
//!
//! Maps game titles to their source path specification, restore policy and
//! save/backup metadata. The whole file is read once per invocation, mutated
//! in memory and written back with [`GameStore::save`].

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::paths::ScummerPaths;
use crate::backup::selection::{SourceKind, SourceSelection};
use crate::error::{ScummerError, ScummerResult};

/// Configuration for a single game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEntry {
    /// Source directory, file, or glob pattern
    pub source: String,

    /// What `source` pointed at when the game was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<SourceKind>,

    /// Delete existing save files before restoring a backup
    #[serde(default)]
    pub clean_restore: bool,

    /// Modification time of the newest file in the last backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save_time: Option<DateTime<Local>>,

    /// When the last backup was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<DateTime<Local>>,
}

impl GameEntry {
    pub fn new(source: impl Into<String>, clean_restore: bool) -> Self {
        let source = source.into();
        Self {
            source_kind: Some(SourceKind::detect(&source)),
            source,
            clean_restore,
            last_save_time: None,
            last_backup_time: None,
        }
    }

    /// The file selection of this game's source
    ///
    /// Entries written before the kind was recorded detect it from disk.
    pub fn selection(&self) -> SourceSelection {
        match self.source_kind {
            Some(kind) => SourceSelection::with_kind(&self.source, kind),
            None => SourceSelection::parse(&self.source),
        }
    }
}

/// Check that a title can name a directory under the backup root
pub fn validate_title(title: &str) -> ScummerResult<()> {
    let trimmed = title.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || title.contains(['/', '\\', '\0'])
    {
        return Err(ScummerError::InvalidTitle(title.to_string()));
    }
    Ok(())
}

/// On-disk layout of the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    /// Global override of the backup root directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backup_dir: Option<PathBuf>,

    #[serde(default)]
    games: BTreeMap<String, GameEntry>,
}

/// The game store, loaded from `config.json`
pub struct GameStore {
    paths: ScummerPaths,
    data: StoreData,
}

impl GameStore {
    /// Load the store from disk; a missing file yields an empty store
    pub fn load(paths: ScummerPaths) -> ScummerResult<Self> {
        let data = read_json(&paths.config_file())?;
        Ok(Self { paths, data })
    }

    /// Write the store back to disk
    pub fn save(&self) -> ScummerResult<()> {
        self.paths.ensure_directories()?;
        write_json_atomic(&self.paths.config_file(), &self.data)
    }

    pub fn paths(&self) -> &ScummerPaths {
        &self.paths
    }

    /// Add a game, or update the source and restore policy of an existing one
    ///
    /// Existing save/backup metadata is kept on update.
    pub fn add_game(
        &mut self,
        title: &str,
        source: impl Into<String>,
        clean_restore: bool,
    ) -> ScummerResult<&GameEntry> {
        validate_title(title)?;
        let added = GameEntry::new(source, clean_restore);
        let entry = self
            .data
            .games
            .entry(title.to_string())
            .and_modify(|entry| {
                entry.source.clone_from(&added.source);
                entry.source_kind = added.source_kind;
                entry.clean_restore = clean_restore;
            })
            .or_insert_with(|| added.clone());
        Ok(&*entry)
    }

    /// Look up a game by title
    pub fn get_game(&self, title: &str) -> ScummerResult<&GameEntry> {
        self.data
            .games
            .get(title)
            .ok_or_else(|| ScummerError::GameNotConfigured(title.to_string()))
    }

    pub fn contains(&self, title: &str) -> bool {
        self.data.games.contains_key(title)
    }

    /// Get the source specification and backup directory for a game
    pub fn get_game_dirs(&self, title: &str) -> ScummerResult<(String, PathBuf)> {
        let entry = self.get_game(title)?;
        validate_title(title)?;
        Ok((entry.source.clone(), self.backup_dir_for(title)))
    }

    /// Backup directory for a game: `<backup root>/<title>/`
    pub fn backup_dir_for(&self, title: &str) -> PathBuf {
        self.backup_root().join(title)
    }

    /// The configured backup root, or the default under the data directory
    pub fn backup_root(&self) -> PathBuf {
        self.data
            .backup_dir
            .clone()
            .unwrap_or_else(|| self.paths.default_backup_dir())
    }

    pub fn set_backup_root(&mut self, backup_dir: Option<PathBuf>) {
        self.data.backup_dir = backup_dir;
    }

    /// Record the save time of the files just backed up, and when it happened
    pub fn update_metadata(
        &mut self,
        title: &str,
        last_save_time: DateTime<Local>,
        backup_time: DateTime<Local>,
    ) -> ScummerResult<()> {
        let entry = self
            .data
            .games
            .get_mut(title)
            .ok_or_else(|| ScummerError::GameNotConfigured(title.to_string()))?;
        entry.last_save_time = Some(last_save_time);
        entry.last_backup_time = Some(backup_time);
        Ok(())
    }

    /// All configured titles, sorted
    pub fn titles(&self) -> Vec<String> {
        self.data.games.keys().cloned().collect()
    }

    pub fn games(&self) -> impl Iterator<Item = (&String, &GameEntry)> {
        self.data.games.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.data.games.is_empty()
    }
}

/// Read JSON from a file, returning a default value if file doesn't exist
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> ScummerResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| ScummerError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ScummerError::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> ScummerResult<()> {
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| ScummerError::Io(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| ScummerError::Config(format!("Failed to serialize store: {}", e)))?;
    writer
        .flush()
        .map_err(|e| ScummerError::Io(format!("Failed to flush store: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ScummerError::Io(format!("Failed to sync store: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ScummerError::Io(format!("Failed to replace {}: {}", path.display(), e))
    })
}

//! Game management CLI commands
//!
//! Implements `add`, `ls` and `config`.

use chrono::{DateTime, Local};
use clap::Args;

use crate::backup::selection::{has_wildcard, SourceSelection};
use crate::config::paths::normalize_path;
use crate::config::store::validate_title;
use crate::config::GameStore;
use crate::display::{format_game_details, format_game_list};
use crate::error::ScummerResult;

/// Arguments for `ssc add`
#[derive(Args)]
pub struct AddArgs {
    /// Game title
    pub title: String,

    /// Save directory, file or glob pattern (quote patterns to keep the shell
    /// from expanding them)
    pub source: String,

    /// Delete existing save files before restoring backups
    #[arg(short, long)]
    pub clean_restore: bool,
}

/// Handle `ssc add`: add a game, or update an existing one
///
/// The title must be usable as a directory name and the source must match
/// at least one file.
pub fn handle_add_command(store: &mut GameStore, args: AddArgs) -> ScummerResult<()> {
    validate_title(&args.title)?;
    let files = SourceSelection::parse(&args.source).resolve()?;

    // Echo pattern matches as a sanity check
    if has_wildcard(&args.source) {
        println!("This pattern matches the following {} file(s):", files.len());
        for file in &files {
            println!("  {}", file.relative.display());
        }
    }

    let source = normalize_path(&args.source);
    let existed = store.contains(&args.title);
    store.add_game(&args.title, source.to_string_lossy(), args.clean_restore)?;
    tracing::info!(title = %args.title, source = %source.display(), existed, "game added");

    let verb = if existed { "updated" } else { "added" };
    println!(
        "Source path for \"{}\" {}: {}",
        args.title,
        verb,
        source.display()
    );
    Ok(())
}

/// Handle `ssc ls`: a table of all games, or details on one
pub fn handle_ls_command(
    store: &GameStore,
    title: Option<&str>,
    now: DateTime<Local>,
) -> ScummerResult<()> {
    let output = match title {
        Some(title) => format_game_details(store, title, now)?,
        None => format_game_list(store, now)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

/// Handle `ssc config`: show paths, optionally changing the backup root
///
/// Returns whether the store was modified.
pub fn handle_config_command(
    store: &mut GameStore,
    backup_dir: Option<String>,
) -> ScummerResult<bool> {
    let changed = match backup_dir {
        Some(dir) => {
            let dir = normalize_path(&dir);
            tracing::info!(backup_dir = %dir.display(), "backup root changed");
            store.set_backup_root(Some(dir));
            true
        }
        None => false,
    };

    let paths = store.paths();
    println!("save-scummer configuration");
    println!("==========================");
    println!("Data directory:   {}", paths.base_dir().display());
    println!("Config file:      {}", paths.config_file().display());
    println!("Log file:         {}", paths.log_file().display());
    println!("Backup directory: {}", store.backup_root().display());
    println!("Games:            {}", store.titles().len());

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::selection::SourceKind;
    use crate::config::ScummerPaths;
    use crate::error::ScummerError;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store() -> (GameStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = GameStore::load(ScummerPaths::with_base_dir(temp.path().join("data"))).unwrap();
        (store, temp)
    }

    #[test]
    fn test_add_stores_normalized_source() {
        let (mut store, temp) = create_test_store();
        let source = temp.path().join("saves");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("slot1.sav"), "x").unwrap();

        handle_add_command(
            &mut store,
            AddArgs {
                title: "game1".into(),
                source: format!("{}/./", source.display()),
                clean_restore: true,
            },
        )
        .unwrap();

        let entry = store.get_game("game1").unwrap();
        assert_eq!(entry.source, fs::canonicalize(&source).unwrap().to_string_lossy());
        assert!(entry.clean_restore);
    }

    #[test]
    fn test_add_rejects_empty_source() {
        let (mut store, temp) = create_test_store();
        let source = temp.path().join("empty");
        fs::create_dir_all(&source).unwrap();

        let result = handle_add_command(
            &mut store,
            AddArgs {
                title: "game1".into(),
                source: source.to_string_lossy().into_owned(),
                clean_restore: false,
            },
        );
        assert!(matches!(result, Err(ScummerError::EmptySelection(_))));
        assert!(!store.contains("game1"));
    }

    #[test]
    fn test_add_rejects_title_outside_backup_root() {
        let (mut store, temp) = create_test_store();
        let source = temp.path().join("saves");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("slot1.sav"), "x").unwrap();

        for title in ["..", "a/b"] {
            let result = handle_add_command(
                &mut store,
                AddArgs {
                    title: title.into(),
                    source: source.to_string_lossy().into_owned(),
                    clean_restore: false,
                },
            );
            assert!(matches!(result, Err(ScummerError::InvalidTitle(_))));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_single_file_records_kind() {
        let (mut store, temp) = create_test_store();
        let save = temp.path().join("game.sav");
        fs::write(&save, "x").unwrap();

        handle_add_command(
            &mut store,
            AddArgs {
                title: "game1".into(),
                source: save.to_string_lossy().into_owned(),
                clean_restore: false,
            },
        )
        .unwrap();
        assert_eq!(
            store.get_game("game1").unwrap().source_kind,
            Some(SourceKind::File)
        );
    }

    #[test]
    fn test_config_sets_backup_root() {
        let (mut store, temp) = create_test_store();
        let root = temp.path().join("elsewhere");

        assert!(!handle_config_command(&mut store, None).unwrap());
        assert!(handle_config_command(&mut store, Some(root.to_string_lossy().into_owned())).unwrap());
        assert_eq!(store.backup_root(), root);
    }
}

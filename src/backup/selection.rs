//! Source path resolution
//!
//! Expands a game's source specification (a directory, a single file, or a
//! glob pattern) into the files to archive, each paired with its path relative
//! to the selection's base directory.

use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::paths::{expand_user, normalize_path};
use crate::error::{ScummerError, ScummerResult};

const WILDCARD_CHARS: [char; 3] = ['*', '?', '['];

/// A file selected for backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedFile {
    /// Absolute, symlink-resolved path on disk
    pub path: PathBuf,
    /// Path relative to the selection's base directory
    pub relative: PathBuf,
}

impl IncludedFile {
    /// Member name inside an archive, always `/`-separated
    pub fn archive_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Check whether a path or pattern contains glob wildcards
pub fn has_wildcard(spec: &str) -> bool {
    spec.contains(WILDCARD_CHARS)
}

/// What a source specification points at
///
/// Recorded when a game is added, so a restore still extracts to the right
/// place after the source files are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Every file below a directory
    Directory,
    /// A single file; its parent is the base directory
    File,
    /// A glob pattern
    Pattern,
}

impl SourceKind {
    /// Classify a specification by what is currently on disk
    ///
    /// An existing path is taken literally even if its name contains `[`.
    pub fn detect(spec: &str) -> Self {
        let spec = spec.trim();
        let path = normalize_path(spec);
        if path.is_file() {
            Self::File
        } else if path.exists() || !has_wildcard(&expand_user(spec).to_string_lossy()) {
            Self::Directory
        } else {
            Self::Pattern
        }
    }
}

/// A parsed source specification
#[derive(Debug, Clone)]
pub struct SourceSelection {
    kind: SourceKind,
    base_dir: PathBuf,
    pattern: String,
}

impl SourceSelection {
    /// Parse a source specification, detecting its kind from the filesystem
    pub fn parse(spec: &str) -> Self {
        Self::with_kind(spec, SourceKind::detect(spec))
    }

    /// Parse a source specification of a known kind
    ///
    /// The base directory is the directory itself, the parent of a file, or
    /// the parent of the first wildcard component of a pattern.
    pub fn with_kind(spec: &str, kind: SourceKind) -> Self {
        let spec = spec.trim();
        match kind {
            SourceKind::Directory => {
                let path = normalize_path(spec);
                let pattern = escaped(&path).join("**").join("*");
                Self::new(kind, path, &pattern)
            }
            SourceKind::File => {
                let path = normalize_path(spec);
                let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
                let base_dir = fs::canonicalize(&parent).unwrap_or(parent);
                let pattern = match path.file_name() {
                    Some(name) => {
                        escaped(&base_dir).join(Pattern::escape(&name.to_string_lossy()))
                    }
                    None => escaped(&path),
                };
                Self::new(kind, base_dir, &pattern)
            }
            SourceKind::Pattern => Self::parse_pattern(spec),
        }
    }

    fn parse_pattern(spec: &str) -> Self {
        let expanded = expand_user(spec);
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&expanded))
                .unwrap_or(expanded)
        };

        let mut base_dir = PathBuf::new();
        let mut rest = PathBuf::new();
        let mut in_pattern = false;
        for component in absolute.components() {
            if !in_pattern && has_wildcard(&component.as_os_str().to_string_lossy()) {
                in_pattern = true;
            }
            if in_pattern {
                rest.push(component);
            } else if component != Component::CurDir {
                base_dir.push(component);
            }
        }

        // A trailing `**` only matches directories
        if rest.file_name() == Some(OsStr::new("**")) {
            rest.push("*");
        }

        let base_dir = fs::canonicalize(&base_dir).unwrap_or(base_dir);
        let pattern = escaped(&base_dir).join(rest);
        Self::new(SourceKind::Pattern, base_dir, &pattern)
    }

    fn new(kind: SourceKind, base_dir: PathBuf, pattern: &Path) -> Self {
        Self {
            kind,
            base_dir,
            pattern: pattern.to_string_lossy().into_owned(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Directory that relative paths are computed against, and that restores
    /// extract into
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The glob pattern equivalent of this selection
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Expand the selection into the files to back up, sorted by relative path
    ///
    /// # Errors
    ///
    /// `EmptySelection` when nothing matches; this means the configured
    /// path is wrong, not that a retry might help.
    pub fn resolve(&self) -> ScummerResult<Vec<IncludedFile>> {
        let candidates: Vec<PathBuf> = match self.kind {
            SourceKind::Directory => WalkDir::new(&self.base_dir)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .collect(),
            SourceKind::File | SourceKind::Pattern => self.expand_pattern()?,
        };

        let mut files = Vec::new();
        for path in candidates {
            // Directories are recreated from member paths on extraction
            if path == self.base_dir || !path.is_file() {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.base_dir) else {
                tracing::debug!(path = %path.display(), "match outside base directory, skipping");
                continue;
            };
            let relative = relative.to_path_buf();
            let absolute = fs::canonicalize(&path).map_err(|e| {
                ScummerError::Io(format!("Failed to resolve {}: {}", path.display(), e))
            })?;

            files.push(IncludedFile {
                path: absolute,
                relative,
            });
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files.dedup_by(|a, b| a.relative == b.relative);

        if files.is_empty() {
            return Err(ScummerError::EmptySelection(self.pattern.clone()));
        }

        tracing::debug!(
            pattern = %self.pattern,
            count = files.len(),
            "resolved source files"
        );
        Ok(files)
    }

    fn expand_pattern(&self) -> ScummerResult<Vec<PathBuf>> {
        let matches = glob::glob(&self.pattern).map_err(|e| ScummerError::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: e.to_string(),
        })?;

        matches
            .map(|entry| {
                entry.map_err(|e| {
                    ScummerError::Io(format!("Failed to read {}: {}", e.path().display(), e.error()))
                })
            })
            .collect()
    }
}

/// Resolve a source specification into the files it selects
pub fn resolve_included_files(spec: &str) -> ScummerResult<Vec<IncludedFile>> {
    SourceSelection::parse(spec).resolve()
}

fn escaped(path: &Path) -> PathBuf {
    PathBuf::from(Pattern::escape(&path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_save_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("game1/slot1/meta")).unwrap();
        fs::write(root.join("game1/settings.ini"), "volume=3").unwrap();
        fs::write(root.join("game1/slot1/save.sav"), "level 10").unwrap();
        fs::write(root.join("game1/slot1/meta/thumb.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("game1/quick.sav"), "quicksave").unwrap();
        temp
    }

    fn relatives(files: &[IncludedFile]) -> Vec<String> {
        files.iter().map(IncludedFile::archive_name).collect()
    }

    #[test]
    fn test_directory_includes_nested_files() {
        let temp = create_save_dir();
        let source = temp.path().join("game1");

        let files = resolve_included_files(source.to_str().unwrap()).unwrap();
        assert_eq!(
            relatives(&files),
            vec![
                "quick.sav",
                "settings.ini",
                "slot1/meta/thumb.png",
                "slot1/save.sav"
            ]
        );
        assert!(files.iter().all(|f| f.path.is_absolute() && f.path.is_file()));
    }

    #[test]
    fn test_explicit_recursive_pattern_matches_plain_directory() {
        let temp = create_save_dir();
        let source = temp.path().join("game1");
        let pattern = format!("{}/**", source.display());

        let plain = resolve_included_files(source.to_str().unwrap()).unwrap();
        let globbed = resolve_included_files(&pattern).unwrap();
        assert_eq!(relatives(&plain), relatives(&globbed));
    }

    #[test]
    fn test_extension_pattern() {
        let temp = create_save_dir();
        let pattern = format!("{}/game1/*.sav", temp.path().display());

        let selection = SourceSelection::parse(&pattern);
        assert_eq!(
            selection.base_dir(),
            fs::canonicalize(temp.path().join("game1")).unwrap()
        );

        let files = selection.resolve().unwrap();
        assert_eq!(relatives(&files), vec!["quick.sav"]);
    }

    #[test]
    fn test_base_dir_is_parent_of_first_wildcard() {
        let temp = create_save_dir();
        let pattern = format!("{}/game1/*/save.sav", temp.path().display());

        let files = resolve_included_files(&pattern).unwrap();
        assert_eq!(relatives(&files), vec!["slot1/save.sav"]);
    }

    #[test]
    fn test_single_file() {
        let temp = create_save_dir();
        let file = temp.path().join("game1/quick.sav");

        let selection = SourceSelection::parse(file.to_str().unwrap());
        assert_eq!(
            selection.base_dir(),
            fs::canonicalize(temp.path().join("game1")).unwrap()
        );
        assert_eq!(relatives(&selection.resolve().unwrap()), vec!["quick.sav"]);
    }

    #[test]
    fn test_empty_directory_is_empty_selection() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();

        let result = resolve_included_files(temp.path().join("empty").to_str().unwrap());
        assert!(matches!(result, Err(ScummerError::EmptySelection(_))));
    }

    #[test]
    fn test_missing_directory_is_empty_selection() {
        let temp = TempDir::new().unwrap();

        let result = resolve_included_files(temp.path().join("missing").to_str().unwrap());
        assert!(matches!(result, Err(ScummerError::EmptySelection(_))));
    }

    #[test]
    fn test_brackets_in_directory_name_are_literal() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Game [GOTY]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("save.dat"), "data").unwrap();

        let files = resolve_included_files(dir.to_str().unwrap()).unwrap();
        assert_eq!(relatives(&files), vec!["save.dat"]);
    }

    #[test]
    fn test_detect_source_kind() {
        let temp = create_save_dir();
        let dir = temp.path().join("game1");

        assert_eq!(SourceKind::detect(dir.to_str().unwrap()), SourceKind::Directory);
        assert_eq!(
            SourceKind::detect(dir.join("quick.sav").to_str().unwrap()),
            SourceKind::File
        );
        assert_eq!(
            SourceKind::detect(&format!("{}/*.sav", dir.display())),
            SourceKind::Pattern
        );
        assert_eq!(
            SourceKind::detect(temp.path().join("missing").to_str().unwrap()),
            SourceKind::Directory
        );
    }

    #[test]
    fn test_missing_file_keeps_parent_as_base() {
        let temp = create_save_dir();
        let file = temp.path().join("game1/quick.sav");
        fs::remove_file(&file).unwrap();

        let selection = SourceSelection::with_kind(file.to_str().unwrap(), SourceKind::File);
        assert_eq!(
            selection.base_dir(),
            fs::canonicalize(temp.path().join("game1")).unwrap()
        );
        assert!(matches!(
            selection.resolve(),
            Err(ScummerError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_file_kind_ignores_siblings() {
        let temp = create_save_dir();
        let file = temp.path().join("game1/settings.ini");

        let selection = SourceSelection::with_kind(file.to_str().unwrap(), SourceKind::File);
        assert_eq!(relatives(&selection.resolve().unwrap()), vec!["settings.ini"]);
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("~/Games/*.sav"));
        assert!(has_wildcard("saves/slot?"));
        assert!(!has_wildcard("/home/user/Games/game1"));
    }
}

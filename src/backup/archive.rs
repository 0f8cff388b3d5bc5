//! Zip archive codec
//!
//! Writes a selection of files into a deflate-compressed zip, each member
//! stored at its relative path, and extracts archives back onto disk.
//! Archives are immutable: an existing archive is never overwritten, and a
//! failed write never leaves a truncated archive behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use super::selection::IncludedFile;
use crate::error::{ScummerError, ScummerResult};

/// File extension of backup archives
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Suffix of archives still being written
const PARTIAL_SUFFIX: &str = ".partial";

const DEFLATE_LEVEL: i64 = 6;

/// Write `files` into a new archive at `archive_path`
///
/// Members are written in relative-path order so the same selection always
/// produces the same member layout. Returns the number of bytes archived.
///
/// # Errors
///
/// - `ArchiveCollision` if `archive_path` already exists; the existing file
///   is left untouched
/// - `Io` if a source file can't be read or the archive can't be written;
///   nothing is left at `archive_path`
pub fn write_archive(archive_path: &Path, files: &[IncludedFile]) -> ScummerResult<u64> {
    if archive_path.exists() {
        return Err(ScummerError::ArchiveCollision(archive_path.to_path_buf()));
    }

    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ScummerError::Io(format!(
                "Failed to create backup directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = partial_path(archive_path);
    let total_bytes = match write_members(&temp_path, files) {
        Ok(total_bytes) => total_bytes,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    if archive_path.exists() {
        let _ = fs::remove_file(&temp_path);
        return Err(ScummerError::ArchiveCollision(archive_path.to_path_buf()));
    }

    fs::rename(&temp_path, archive_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ScummerError::Io(format!(
            "Failed to move archive into place at {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    tracing::info!(
        archive = %archive_path.display(),
        files = files.len(),
        bytes = total_bytes,
        "archive written"
    );
    Ok(total_bytes)
}

fn write_members(path: &Path, files: &[IncludedFile]) -> ScummerResult<u64> {
    let file = File::create(path)
        .map_err(|e| ScummerError::Io(format!("Failed to create {}: {}", path.display(), e)))?;
    let mut archive = ZipWriter::new(BufWriter::new(file));
    let options = data_options();

    let mut members: Vec<&IncludedFile> = files.iter().collect();
    members.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut total_bytes = 0u64;
    for member in members {
        let mut source = File::open(&member.path).map_err(|e| {
            ScummerError::Io(format!("Failed to read {}: {}", member.path.display(), e))
        })?;

        archive
            .start_file(member.archive_name(), options)
            .map_err(|e| zip_write_error(path, e))?;
        total_bytes += io::copy(&mut source, &mut archive).map_err(|e| {
            ScummerError::Io(format!("Failed to archive {}: {}", member.path.display(), e))
        })?;
        tracing::debug!(member = %member.archive_name(), "added to archive");
    }

    let writer = archive.finish().map_err(|e| zip_write_error(path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| ScummerError::Io(format!("Failed to flush {}: {}", path.display(), e)))?;
    file.sync_all()
        .map_err(|e| ScummerError::Io(format!("Failed to sync {}: {}", path.display(), e)))?;

    Ok(total_bytes)
}

/// Extract every member of an archive beneath `destination`
///
/// Creates `destination` if needed and overwrites files that already exist
/// at a member's path. Each member is fully decompressed before anything is
/// written for it, and lands on disk through a rename. Returns the number of
/// files extracted.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> ScummerResult<usize> {
    let mut archive = open_archive(archive_path)?;

    fs::create_dir_all(destination).map_err(|e| {
        ScummerError::Io(format!("Failed to create {}: {}", destination.display(), e))
    })?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| zip_read_error(archive_path, e))?;

        // Rejects absolute paths and `..` traversal
        let Some(relative) = member.enclosed_name() else {
            return Err(unsafe_member(archive_path, member.name()));
        };
        let target = destination.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                ScummerError::Io(format!("Failed to create {}: {}", target.display(), e))
            })?;
            continue;
        }

        let mut contents = Vec::with_capacity(usize::try_from(member.size()).unwrap_or(0));
        member
            .read_to_end(&mut contents)
            .map_err(|e| corrupt_member(archive_path, member.name(), e))?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScummerError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        write_file_atomic(&target, &contents)?;

        tracing::debug!(target = %target.display(), "extracted");
        extracted += 1;
    }

    tracing::info!(
        archive = %archive_path.display(),
        destination = %destination.display(),
        files = extracted,
        "archive extracted"
    );
    Ok(extracted)
}

fn write_file_atomic(target: &Path, contents: &[u8]) -> ScummerResult<()> {
    let temp_path = partial_path(target);
    fs::write(&temp_path, contents).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ScummerError::Io(format!("Failed to write {}: {}", target.display(), e))
    })?;

    fs::rename(&temp_path, target).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ScummerError::Io(format!("Failed to write {}: {}", target.display(), e))
    })
}

/// Check that an archive exists and every member decompresses cleanly,
/// returning its member count
///
/// Nothing is written; a restore runs this before touching the saves.
pub fn verify_archive(archive_path: &Path) -> ScummerResult<usize> {
    let mut archive = open_archive(archive_path)?;

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| zip_read_error(archive_path, e))?;
        if member.enclosed_name().is_none() {
            return Err(unsafe_member(archive_path, member.name()));
        }
        io::copy(&mut member, &mut io::sink())
            .map_err(|e| corrupt_member(archive_path, member.name(), e))?;
    }

    Ok(archive.len())
}

fn open_archive(archive_path: &Path) -> ScummerResult<ZipArchive<BufReader<File>>> {
    let file = File::open(archive_path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScummerError::ArchiveNotFound(archive_path.to_path_buf()),
        _ => ScummerError::Io(format!("Failed to open {}: {}", archive_path.display(), e)),
    })?;
    if file.metadata().map(|m| m.is_dir()).unwrap_or(false) {
        return Err(ScummerError::ArchiveNotFound(archive_path.to_path_buf()));
    }

    ZipArchive::new(BufReader::new(file)).map_err(|e| zip_read_error(archive_path, e))
}

/// Path a file is written to before being moved into place
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

fn data_options() -> FileOptions<'static, ()> {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL))
}

fn zip_write_error(path: &Path, err: ZipError) -> ScummerError {
    ScummerError::Io(format!("Failed to write archive {}: {}", path.display(), err))
}

fn unsafe_member(path: &Path, name: &str) -> ScummerError {
    ScummerError::CorruptArchive {
        path: path.to_path_buf(),
        reason: format!("unsafe member path '{}'", name),
    }
}

/// Reading a member fails on bad deflate data or a CRC mismatch
fn corrupt_member(path: &Path, name: &str, err: io::Error) -> ScummerError {
    ScummerError::CorruptArchive {
        path: path.to_path_buf(),
        reason: format!("member '{}': {}", name, err),
    }
}

fn zip_read_error(path: &Path, err: ZipError) -> ScummerError {
    match err {
        ZipError::Io(e) if !matches!(e.kind(), ErrorKind::UnexpectedEof) => {
            ScummerError::Io(format!("Failed to read archive {}: {}", path.display(), e))
        }
        other => ScummerError::CorruptArchive {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

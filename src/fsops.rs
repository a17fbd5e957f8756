use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::debug;

use crate::error::FileMoveError;

/// Move a single file, returning the number of bytes it holds.
///
/// Uses `rename` when possible and falls back to copy + delete across
/// filesystems, carrying the modification time over.
pub fn move_file(src: &Path, dst: &Path) -> Result<u64, FileMoveError> {
    let metadata = match std::fs::symlink_metadata(src) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FileMoveError::SourceVanished {
                path: src.to_path_buf(),
            });
        }
        Err(e) => return Err(FileMoveError::io("inspect", src, e)),
    };

    match std::fs::rename(src, dst) {
        Ok(()) => Ok(metadata.len()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices && metadata.is_file() => {
            debug!(src = %src.display(), dst = %dst.display(), "cross-device move, copying");
            let options = fs_extra::file::CopyOptions::new();
            fs_extra::file::move_file(src, dst, &options)
                .map_err(|e| FileMoveError::io("move", src, io::Error::other(e)))?;
            let mtime = FileTime::from_last_modification_time(&metadata);
            if let Err(e) = filetime::set_file_mtime(dst, mtime) {
                debug!(dst = %dst.display(), error = %e, "could not restore modification time");
            }
            Ok(metadata.len())
        }
        Err(e) => Err(FileMoveError::io("move", src, e)),
    }
}

/// Create every missing directory above `path`, returning the ones that
/// had to be created, outermost first.
pub fn ensure_parent(path: &Path) -> Result<Vec<PathBuf>, FileMoveError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(Vec::new());
    };
    let mut missing: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|dir| {
            !dir.as_os_str().is_empty()
                && matches!(std::fs::symlink_metadata(dir), Err(e) if e.kind() == io::ErrorKind::NotFound)
        })
        .map(Path::to_path_buf)
        .collect();
    if missing.is_empty() {
        return Ok(missing);
    }
    missing.reverse();
    std::fs::create_dir_all(parent).map_err(|e| FileMoveError::io("create directory", parent, e))?;
    Ok(missing)
}

/// Remove `dir` if it has no entries. Returns whether it was removed.
pub fn remove_if_empty(dir: &Path) -> io::Result<bool> {
    if std::fs::read_dir(dir)?.next().is_some() {
        return Ok(false);
    }
    std::fs::remove_dir(dir)?;
    Ok(true)
}

/// Remove whichever of `dirs` are empty, deepest first, and return them.
pub fn remove_empty_dirs<'a>(dirs: impl IntoIterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut dirs: Vec<&Path> = dirs.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    dirs.sort_by_key(|d| Reverse(d.components().count()));
    dirs.into_iter()
        .filter(|d| matches!(remove_if_empty(d), Ok(true)))
        .map(Path::to_path_buf)
        .collect()
}

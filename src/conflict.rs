use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::FileMoveError;

/// Compute a destination that does not exist yet.
///
/// Returns `target` untouched when it is free, otherwise the first free
/// `"stem (n).ext"` with `n` counting up from 1. Existence is checked
/// afresh for every candidate; a concurrent writer can still race us.
pub fn resolve(target: &Path) -> Result<PathBuf, FileMoveError> {
    if !occupied(target)? {
        return Ok(target.to_path_buf());
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target.file_stem().unwrap_or_default();
    let extension = target.extension();

    for n in 1..=u32::MAX {
        let mut name = OsString::from(stem);
        name.push(format!(" ({n})"));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }
        let candidate = parent.join(name);
        if !occupied(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(FileMoveError::ConflictUnresolvable {
        path: target.to_path_buf(),
    })
}

/// Dangling symlinks count as occupied.
fn occupied(path: &Path) -> Result<bool, FileMoveError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FileMoveError::io("inspect", path, e)),
    }
}

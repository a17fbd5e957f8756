use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

use crate::error::{Error, Result};
use crate::model::MoveMode;

/// Absolute, existing directory to operate on.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let absolute = root
        .absolutize()
        .map_err(|e| Error::InvalidPath {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?
        .into_owned();
    let metadata = std::fs::metadata(&absolute).map_err(|e| Error::InvalidPath {
        path: absolute.clone(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(Error::InvalidPath {
            path: absolute,
            reason: "not a directory".into(),
        });
    }
    Ok(absolute)
}

/// Check mode parameters and drop inputs that can never match.
pub fn normalize_mode(mode: &MoveMode) -> Result<MoveMode> {
    match mode {
        MoveMode::Upward {
            levels,
            delete_empty,
        } => {
            if *levels == 0 {
                return Err(Error::InvalidInput("levels must be at least 1".into()));
            }
            Ok(MoveMode::Upward {
                levels: *levels,
                delete_empty: *delete_empty,
            })
        }
        MoveMode::Downward { delimiters, remove } => {
            let delimiters: Vec<String> = delimiters.iter().filter(|d| !d.is_empty()).cloned().collect();
            if delimiters.is_empty() {
                return Err(Error::InvalidInput("at least one non-empty delimiter is required".into()));
            }
            let remove = remove
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            Ok(MoveMode::Downward { delimiters, remove })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_root(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert!(err.is_setup_error());
    }

    #[test]
    fn file_root_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(resolve_root(&file), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn root_is_made_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_root(&dir.path().join("./")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.is_dir());
    }

    #[test]
    fn zero_levels_rejected() {
        let mode = MoveMode::Upward {
            levels: 0,
            delete_empty: false,
        };
        assert!(matches!(normalize_mode(&mode), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn downward_inputs_are_cleaned() {
        let mode = MoveMode::Downward {
            delimiters: vec!["".into(), "_".into(), " ".into()],
            remove: vec![" IMG ".into(), "".into(), "  ".into()],
        };
        assert_eq!(
            normalize_mode(&mode).unwrap(),
            MoveMode::Downward {
                delimiters: vec!["_".into(), " ".into()],
                remove: vec!["IMG".into()],
            }
        );
    }

    #[test]
    fn downward_needs_a_delimiter() {
        let mode = MoveMode::Downward {
            delimiters: vec!["".into()],
            remove: vec![],
        };
        assert!(matches!(normalize_mode(&mode), Err(Error::InvalidInput(_))));
    }
}

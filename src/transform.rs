use std::path::{Component, Path, PathBuf};

/// Target of an upward move, relative to the operation root.
///
/// Drops `levels` trailing segments from the directory part of `relative`,
/// never climbing above the root, and keeps the file name as is. Returns
/// `None` when `relative` has no file name.
pub fn upward(relative: &Path, levels: usize) -> Option<PathBuf> {
    let file_name = relative.file_name()?;
    let dirs: Vec<_> = relative
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let keep = dirs.len().saturating_sub(levels);

    let mut target: PathBuf = dirs[..keep].iter().collect();
    target.push(file_name);
    Some(target)
}

/// Where a downward split puts a file, relative to its current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitTarget {
    /// Subdirectories to create, outermost first.
    pub dirs: Vec<String>,
    /// New file name, extension included.
    pub file_name: String,
}

impl SplitTarget {
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.dirs.iter().collect();
        path.push(&self.file_name);
        path
    }
}

/// Split a file name into nested directories.
///
/// `remove` entries are trimmed and stripped from the stem (every
/// occurrence, literal match, in order), then the stem is split on each
/// delimiter in turn. The last fragment becomes the file stem and the
/// extension is re-appended. Empty inputs are ignored, and empty, `.` or
/// `..` fragments are dropped so the file stays in the current directory
/// for them. Returns `None` if no usable fragment is left.
pub fn downward(file_name: &str, delimiters: &[String], remove: &[String]) -> Option<SplitTarget> {
    let path = Path::new(file_name);
    let mut stem = path.file_stem()?.to_str()?.to_string();
    let extension = path.extension().and_then(|e| e.to_str());

    stem = strip_all(&stem, remove);

    let mut fragments = vec![stem];
    for delimiter in delimiters.iter().filter(|d| !d.is_empty()) {
        fragments = fragments
            .iter()
            .flat_map(|f| f.split(delimiter.as_str()))
            .map(str::to_string)
            .collect();
    }

    let mut fragments: Vec<String> = fragments
        .into_iter()
        .filter(|f| !f.is_empty() && f != "." && f != "..")
        .collect();
    let last = fragments.pop()?;
    let file_name = match extension {
        Some(ext) => format!("{last}.{ext}"),
        None => last,
    };

    Some(SplitTarget {
        dirs: fragments,
        file_name,
    })
}

/// Exact, non-regex substring removal.
pub fn strip_all(stem: &str, remove: &[String]) -> String {
    remove
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .fold(stem.to_string(), |acc, r| acc.replace(r, ""))
}

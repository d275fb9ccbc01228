// Directory walk producing candidate files in a deterministic order
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ConvertError, Result};

/// One result of the walk
#[derive(Debug)]
pub enum WalkEntry {
    File(PathBuf),
    /// A directory below the root that could not be read
    Error { path: PathBuf, error: std::io::Error },
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

/// Enumerate files below `root` whose extension is in `extensions`.
///
/// Directory entries are visited in sorted order. A root that is itself a
/// file is returned as the only entry. Failing to read the root is fatal;
/// failures further down are reported as [`WalkEntry::Error`] entries.
pub fn collect_files(root: &Path, extensions: &[String]) -> Result<Vec<WalkEntry>> {
    let metadata = fs::metadata(root).map_err(|source| ConvertError::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    if metadata.is_file() {
        return Ok(vec![WalkEntry::File(root.to_path_buf())]);
    }

    let children = read_sorted(root).map_err(|source| ConvertError::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    visit(children, extensions, &mut entries);
    debug!("Found {} candidate entries under {}", entries.len(), root.display());
    Ok(entries)
}

fn read_sorted(dir: &Path) -> std::io::Result<Vec<(PathBuf, fs::FileType)>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        children.push((entry.path(), entry.file_type()?));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

fn visit(children: Vec<(PathBuf, fs::FileType)>, extensions: &[String], entries: &mut Vec<WalkEntry>) {
    for (path, file_type) in children {
        if file_type.is_dir() {
            match read_sorted(&path) {
                Ok(nested) => visit(nested, extensions, entries),
                Err(error) => entries.push(WalkEntry::Error { path, error }),
            }
        } else if has_extension(&path, extensions) {
            entries.push(WalkEntry::File(path));
        }
    }
}

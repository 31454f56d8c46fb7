//! Client path resolution inside the library root.

use crate::error::{AppError, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Absolute, symlink-free form of the library root.
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(root).map_err(|e| {
        AppError::Config(format!("Invalid library root {}: {}", root.display(), e))
    })?;

    absolute.canonicalize().map_err(|e| {
        AppError::Config(format!("Invalid library root {}: {}", absolute.display(), e))
    })
}

/// Remove `.` and `..` without touching the filesystem.
///
/// `..` never climbs above the filesystem root.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(cleaned.components().next_back(), Some(Component::Normal(_))) {
                    cleaned.pop();
                } else if !cleaned.has_root() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Resolve a client path against a canonical trusted root.
///
/// The path is joined to the root, cleaned, canonicalized (following
/// symlinks) and must still be inside the root afterwards.
pub fn resolve(requested: &str, trusted_root: &Path) -> Result<PathBuf> {
    let relative = requested.trim_start_matches(['/', '\\']);
    let joined = lexical_clean(&trusted_root.join(relative));

    let canonical = joined.canonicalize().map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::NotFound(requested.to_string()),
        _ => AppError::Traversal(format!("{}: {}", requested, e)),
    })?;

    if !canonical.starts_with(trusted_root) {
        return Err(AppError::Traversal(requested.to_string()));
    }

    Ok(canonical)
}

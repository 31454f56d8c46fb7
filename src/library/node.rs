//! Classification of filesystem paths into catalog nodes.

use std::path::Path;

/// OPDS navigation feed content type.
pub const NAVIGATION_TYPE: &str = "application/atom+xml;profile=opds-catalog;kind=navigation";

/// OPDS acquisition feed content type.
pub const ACQUISITION_TYPE: &str = "application/atom+xml;profile=opds-catalog;kind=acquisition";

/// What a path is, from the catalog's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Nothing there (or unreadable).
    NotExists,
    /// A single file, served as raw bytes.
    Leaf,
    /// A directory with at least one subdirectory.
    Navigation,
    /// A directory with no subdirectories.
    Acquisition,
}

impl NodeKind {
    /// Feed content type for directory nodes.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            NodeKind::Navigation => Some(NAVIGATION_TYPE),
            NodeKind::Acquisition => Some(ACQUISITION_TYPE),
            NodeKind::NotExists | NodeKind::Leaf => None,
        }
    }
}

/// Classify a path by its shape on disk.
///
/// Symlinks are followed, both for the path and for its children. A child
/// only makes the path a navigation node if it resolves to a directory
/// inside `root`.
pub fn classify(path: &Path, root: &Path) -> NodeKind {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "stat failed");
            return NodeKind::NotExists;
        }
    };

    if !metadata.is_dir() {
        return NodeKind::Leaf;
    }

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read directory");
            return NodeKind::NotExists;
        }
    };

    let has_subdir = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.path().canonicalize().ok())
        .any(|target| target.starts_with(root) && target.is_dir());

    if has_subdir {
        NodeKind::Navigation
    } else {
        NodeKind::Acquisition
    }
}

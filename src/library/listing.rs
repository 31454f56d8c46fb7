//! Directory listing for catalog feeds.

use super::mime::{FileKind, MimeRegistry};
use super::node::{NodeKind, classify};
use crate::formats::{self, Metadata};
use crate::opds::rel;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::path::Path;

/// Marks names that never show up in the catalog.
const HIDDEN_PREFIX: char = '.';

/// One visible child of a listed directory.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Display name: metadata title, or the file name.
    pub name: String,
    /// Name on disk, used to build links.
    pub file_name: String,
    /// MIME type of the linked resource.
    pub mime_type: String,
    /// Link relation of the primary link.
    pub rel: &'static str,
    /// Node kind of the child.
    pub kind: NodeKind,
    /// Last modification time.
    pub updated: DateTime<Utc>,
    /// Format metadata, `Noop` when nothing was recognized.
    pub metadata: Metadata,
}

impl CatalogEntry {
    /// Author used as primary sort key, empty when unknown.
    pub fn creator(&self) -> &str {
        self.metadata.creator().unwrap_or_default()
    }
}

/// List the visible children of a directory, sorted.
///
/// Children that resolve outside `root` are left out. Never fails: an
/// unreadable directory lists as empty.
pub fn list(dir: &Path, root: &Path, registry: &MimeRegistry) -> Vec<CatalogEntry> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to list directory");
            return Vec::new();
        }
    };

    let mut entries: Vec<CatalogEntry> = read_dir
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter_map(|entry| {
            let Ok(file_name) = entry.file_name().into_string() else {
                tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 name");
                return None;
            };
            build_entry(&entry.path(), root, file_name, registry)
        })
        .collect();

    sort_entries(&mut entries);
    entries
}

fn build_entry(
    path: &Path,
    root: &Path,
    file_name: String,
    registry: &MimeRegistry,
) -> Option<CatalogEntry> {
    if file_name.starts_with(HIDDEN_PREFIX) {
        return None;
    }

    let target = match path.canonicalize() {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping unresolvable entry");
            return None;
        }
    };
    if !target.starts_with(root) {
        tracing::debug!(path = %path.display(), "Skipping entry outside the library root");
        return None;
    }
    let path = target.as_path();

    let kind = classify(path, root);
    let (mime_type, rel) = match kind {
        NodeKind::NotExists => return None,
        NodeKind::Leaf => {
            let file_kind = registry.kind_of(&file_name)?;
            let mime = registry.type_for(&file_name)?.to_string();
            let rel = match file_kind {
                FileKind::Book => rel::ACQUISITION,
                FileKind::Image => rel::THUMBNAIL,
            };
            (mime, rel)
        }
        NodeKind::Navigation | NodeKind::Acquisition => {
            (kind.content_type()?.to_string(), rel::SUBSECTION)
        }
    };

    let updated = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping entry without mtime");
            return None;
        }
    };

    let metadata = if kind == NodeKind::Leaf && registry.is_book(&file_name) {
        formats::metadata_for(path, &mime_type)
    } else {
        Metadata::Noop
    };

    let name = metadata.title().unwrap_or(&file_name).to_string();

    Some(CatalogEntry {
        name,
        file_name,
        mime_type,
        rel,
        kind,
        updated,
        metadata,
    })
}

/// Creator, then display name, then file name. Byte order, empty first.
fn compare_entries(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    a.creator()
        .cmp(b.creator())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.file_name.cmp(&b.file_name))
}

/// Sort entries into catalog order.
pub fn sort_entries(entries: &mut [CatalogEntry]) {
    entries.sort_by(compare_entries);
}

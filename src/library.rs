//! Mapping of the library directory tree onto catalog nodes.

pub mod cover;
pub mod listing;
pub mod mime;
pub mod node;
pub mod resolve;

pub use cover::Image;
pub use listing::CatalogEntry;
pub use mime::{FileKind, MimeRegistry};
pub use node::NodeKind;

use crate::config::{Config, CoverConfig};
use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};

/// A file to stream back to the client.
#[derive(Debug, Clone)]
pub struct LeafFile {
    /// Resolved path inside the root.
    pub path: PathBuf,
    /// MIME type by extension.
    pub content_type: String,
    /// Size in bytes.
    pub length: u64,
}

/// Read-only view of the library directory.
///
/// Holds only immutable configuration; every call reads the filesystem again.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    mime: MimeRegistry,
    covers: CoverConfig,
}

impl Library {
    /// Open the library described by the configuration.
    pub fn open(config: &Config) -> Result<Self> {
        Self::new(
            &config.library.root,
            MimeRegistry::new(&config.mime),
            config.covers.clone(),
        )
    }

    /// Create a library rooted at `root`.
    pub fn new(root: &Path, mime: MimeRegistry, covers: CoverConfig) -> Result<Self> {
        let root = resolve::canonical_root(root)?;
        if !root.is_dir() {
            return Err(AppError::Config(format!(
                "Library root is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root, mime, covers })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a catalog path to a location inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        resolve::resolve(path, &self.root)
    }

    /// Classify a catalog path. Anything unresolvable does not exist.
    pub fn node_kind(&self, path: &str) -> NodeKind {
        match self.resolve(path) {
            Ok(resolved) => node::classify(&resolved, &self.root),
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "Path did not resolve");
                NodeKind::NotExists
            }
        }
    }

    /// List a catalog directory.
    pub fn list(&self, path: &str) -> Vec<CatalogEntry> {
        match self.resolve(path) {
            Ok(resolved) => listing::list(&resolved, &self.root, &self.mime),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Refusing to list");
                Vec::new()
            }
        }
    }

    /// Look up a leaf file to stream.
    pub fn file(&self, path: &str) -> Result<LeafFile> {
        let resolved = self.resolve(path)?;
        let metadata = std::fs::metadata(&resolved)?;
        if metadata.is_dir() {
            return Err(AppError::NotFound(path.to_string()));
        }

        let name = resolved
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let content_type = self
            .mime
            .type_for(name)
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(LeafFile {
            path: resolved,
            content_type,
            length: metadata.len(),
        })
    }

    /// Resolve a book path and its MIME type for image extraction.
    fn book(&self, path: &str) -> Option<(PathBuf, String)> {
        let resolved = match self.resolve(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "Cover path did not resolve");
                return None;
            }
        };
        if !resolved.is_file() {
            return None;
        }

        let name = resolved.file_name()?.to_str()?;
        if !self.mime.is_book(name) {
            return None;
        }
        let mime = self.mime.type_for(name)?.to_string();
        Some((resolved, mime))
    }

    /// Cover of a book as JPEG, if it has one.
    pub fn cover(&self, path: &str) -> Option<Image> {
        let (resolved, mime) = self.book(path)?;
        cover::cover(&resolved, &mime, &self.covers)
    }

    /// Thumbnail of a book as JPEG, if it has a cover.
    pub fn thumbnail(&self, path: &str) -> Option<Image> {
        let (resolved, mime) = self.book(path)?;
        cover::thumbnail(&resolved, &mime, &self.covers)
    }
}

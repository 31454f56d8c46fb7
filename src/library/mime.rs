//! Extension to MIME type registry.

use crate::config::{BookFormat, MimeConfig};
use std::collections::HashMap;
use std::path::Path;

/// What a registered extension is served as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A book, served with an acquisition link.
    Book,
    /// A bare image, served as a thumbnail link.
    Image,
}

/// Immutable registry of served extensions, built once at startup.
#[derive(Debug, Clone)]
pub struct MimeRegistry {
    types: HashMap<String, (FileKind, String)>,
}

const BUILTIN_IMAGES: [(&str, &str); 4] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

impl Default for MimeRegistry {
    fn default() -> Self {
        Self::new(&MimeConfig::default())
    }
}

impl MimeRegistry {
    /// Build the registry from the built-in formats plus configured extras.
    ///
    /// Configured entries override built-in ones with the same extension.
    pub fn new(extra: &MimeConfig) -> Self {
        let mut types = HashMap::new();

        for format in BookFormat::ALL {
            types.insert(
                format.extension().to_string(),
                (FileKind::Book, format.mime_type().to_string()),
            );
        }
        for (ext, mime) in BUILTIN_IMAGES {
            types.insert(ext.to_string(), (FileKind::Image, mime.to_string()));
        }

        let extras = extra
            .books
            .iter()
            .map(|e| (FileKind::Book, e))
            .chain(extra.images.iter().map(|e| (FileKind::Image, e)));
        for (kind, (ext, mime)) in extras {
            let ext = ext.trim_start_matches('.').to_lowercase();
            if ext.is_empty() || mime.trim().is_empty() {
                tracing::warn!(extension = %ext, "Ignoring empty MIME registration");
                continue;
            }
            types.insert(ext, (kind, mime.trim().to_string()));
        }

        Self { types }
    }

    fn lookup(&self, name: &str) -> Option<&(FileKind, String)> {
        let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
        self.types.get(&ext)
    }

    /// MIME type for a file name, by extension.
    pub fn type_for(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|(_, mime)| mime.as_str())
    }

    /// Whether a file name is a registered book or image.
    pub fn kind_of(&self, name: &str) -> Option<FileKind> {
        self.lookup(name).map(|(kind, _)| *kind)
    }

    /// Whether a file name has a registered book extension.
    pub fn is_book(&self, name: &str) -> bool {
        self.kind_of(name) == Some(FileKind::Book)
    }
}

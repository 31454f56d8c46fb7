mod cbz;
mod epub;
mod pdf;

use crate::error::Result;
use std::path::Path;

/// Metadata read from a book container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    /// Book title.
    pub title: Option<String>,
    /// Language code (e.g., "en", "fr").
    pub language: Option<String>,
    /// ISBN, UUID or other identifier.
    pub identifier: Option<String>,
    /// Primary author.
    pub creator: Option<String>,
    /// Contributor (translator, editor...).
    pub contributor: Option<String>,
    /// Publisher name.
    pub publisher: Option<String>,
    /// Subjects, comma separated.
    pub subject: Option<String>,
    /// Long description, plain text or HTML.
    pub description: Option<String>,
    /// Whether a cover image can be extracted.
    pub has_cover: bool,
    /// Whether a thumbnail can be rendered.
    pub has_thumbnail: bool,
}

/// Metadata attached to a catalog entry.
///
/// `Noop` is used for anything no reader recognizes; it answers empty for
/// every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Metadata {
    /// No reader recognized the file.
    #[default]
    Noop,
    /// Metadata read from the file.
    Book(BookMetadata),
}

macro_rules! metadata_field {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> Option<&str> {
                match self {
                    Metadata::Noop => None,
                    Metadata::Book(m) => m.$name.as_deref().filter(|s| !s.is_empty()),
                }
            }
        )*
    };
}

impl Metadata {
    metadata_field!(
        /// Book title.
        title,
        /// Language code.
        language,
        /// Identifier.
        identifier,
        /// Primary author.
        creator,
        /// Contributor.
        contributor,
        /// Publisher.
        publisher,
        /// Subjects.
        subject,
        /// Description.
        description,
    );

    /// Whether a cover can be extracted.
    pub fn has_cover(&self) -> bool {
        matches!(self, Metadata::Book(m) if m.has_cover)
    }

    /// Whether a thumbnail can be rendered.
    pub fn has_thumbnail(&self) -> bool {
        matches!(self, Metadata::Book(m) if m.has_thumbnail)
    }
}

/// Format-specific metadata readers, selected by MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataProvider {
    /// EPUB container (OPF package).
    Epub,
    /// PDF info dictionary.
    Pdf,
    /// Comic book ZIP archive.
    Comic,
}

impl MetadataProvider {
    /// Pick the reader for a MIME type, if any.
    pub fn for_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/epub+zip" => Some(MetadataProvider::Epub),
            "application/pdf" => Some(MetadataProvider::Pdf),
            "application/x-cbz" | "application/vnd.comicbook+zip" => {
                Some(MetadataProvider::Comic)
            }
            _ => None,
        }
    }

    /// Read metadata from a book file.
    pub fn read(&self, path: &Path) -> Result<BookMetadata> {
        match self {
            MetadataProvider::Epub => epub::read_metadata(path),
            MetadataProvider::Pdf => pdf::read_metadata(path),
            MetadataProvider::Comic => cbz::read_metadata(path),
        }
    }

    /// Extract the raw bytes of the cover image, in whatever codec the
    /// container stores it.
    pub fn cover_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match self {
            MetadataProvider::Epub => epub::extract_cover(path),
            MetadataProvider::Pdf => pdf::extract_cover(path),
            MetadataProvider::Comic => cbz::extract_cover(path),
        }
    }
}

/// Read metadata for a file of the given MIME type.
///
/// Unknown formats and unreadable files both end up as `Metadata::Noop`.
pub fn metadata_for(path: &Path, mime: &str) -> Metadata {
    let Some(provider) = MetadataProvider::for_mime(mime) else {
        return Metadata::Noop;
    };

    match provider.read(path) {
        Ok(metadata) => Metadata::Book(metadata),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Failed to extract metadata");
            Metadata::Noop
        }
    }
}

/// Trim a value and drop it if empty.
fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

//! PDF format reader.

use super::{BookMetadata, non_empty};
use crate::error::{AppError, Result};
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

/// Extract text content from a PDF info dictionary value.
fn extract_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => {
            // UTF-16BE with BOM
            if bytes.starts_with(&[0xFE, 0xFF]) {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks(2)
                    .map(|chunk| u16::from_be_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]))
                    .collect();
                String::from_utf16(&utf16).ok()
            } else {
                // UTF-8, falling back to Latin-1
                Some(
                    String::from_utf8(bytes.clone())
                        .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect()),
                )
            }
        }
        Object::Name(name) => String::from_utf8(name.clone()).ok(),
        _ => None,
    }
}

fn info_field(info: &Dictionary, key: &[u8]) -> Option<String> {
    info.get(key)
        .ok()
        .and_then(extract_text)
        .and_then(|t| non_empty(&t))
}

fn load(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| AppError::Pdf(e.to_string()))
}

/// Follow a reference or return the inline dictionary.
fn dictionary<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    match obj? {
        Object::Reference(r) => doc.get_dictionary(*r).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Find the first JPEG image drawn on the first page.
fn first_page_jpeg(doc: &Document) -> Option<Vec<u8>> {
    let first_page_id = *doc.get_pages().values().next()?;
    let page = doc.get_dictionary(first_page_id).ok()?;
    let resources = dictionary(doc, page.get(b"Resources").ok())?;
    let xobjects = dictionary(doc, resources.get(b"XObject").ok())?;

    xobjects.iter().find_map(|(_name, obj)| {
        let Object::Reference(xobj_ref) = obj else {
            return None;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*xobj_ref) else {
            return None;
        };

        let is_image = matches!(
            stream.dict.get(b"Subtype"),
            Ok(Object::Name(n)) if n == b"Image"
        );
        let is_dct = match stream.dict.get(b"Filter") {
            Ok(Object::Name(n)) => n == b"DCTDecode",
            Ok(Object::Array(arr)) => arr
                .iter()
                .any(|item| matches!(item, Object::Name(n) if n == b"DCTDecode")),
            _ => false,
        };

        (is_image && is_dct && stream.content.starts_with(&[0xFF, 0xD8, 0xFF]))
            .then(|| stream.content.clone())
    })
}

/// Read PDF info dictionary metadata.
pub(super) fn read_metadata(path: &Path) -> Result<BookMetadata> {
    let doc = load(path)?;
    let mut metadata = BookMetadata::default();

    if let Ok(info_ref) = doc.trailer.get(b"Info").and_then(Object::as_reference)
        && let Ok(info) = doc.get_dictionary(info_ref)
    {
        metadata.title = info_field(info, b"Title");
        metadata.creator = info_field(info, b"Author");
        metadata.subject = info_field(info, b"Keywords");
        metadata.description = info_field(info, b"Subject");
    }

    metadata.has_cover = first_page_jpeg(&doc).is_some();
    metadata.has_thumbnail = metadata.has_cover;

    Ok(metadata)
}

/// Extract the first-page JPEG, if the page embeds one.
pub(super) fn extract_cover(path: &Path) -> Result<Option<Vec<u8>>> {
    let doc = load(path)?;
    Ok(first_page_jpeg(&doc))
}

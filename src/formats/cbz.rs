//! CBZ (Comic Book ZIP) format reader.

use super::{BookMetadata, non_empty};
use crate::error::Result;
use roxmltree::Document;
use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Check if a filename is an image.
fn is_image_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".jpg")
        || lower.ends_with(".jpeg")
        || lower.ends_with(".png")
        || lower.ends_with(".gif")
        || lower.ends_with(".webp")
}

/// Get sorted list of image files in archive.
fn get_image_files(archive: &ZipArchive<File>) -> Vec<String> {
    let mut images: Vec<String> = archive
        .file_names()
        .filter(|name| is_image_file(name))
        .filter(|name| !name.contains("__MACOSX"))
        .map(String::from)
        .collect();

    // page2 before page10
    images.sort_by(|a, b| natord_compare(a, b));

    images
}

/// Apply fields from an embedded ComicInfo.xml.
fn apply_comic_info(content: &str, metadata: &mut BookMetadata) -> Result<()> {
    let doc = Document::parse(content)?;

    for node in doc.root_element().children().filter(|n| n.is_element()) {
        let Some(text) = node.text().and_then(non_empty) else {
            continue;
        };
        match node.tag_name().name() {
            "Title" => metadata.title = Some(text),
            "Writer" => metadata.creator = Some(text),
            "Penciller" => metadata.contributor = Some(text),
            "Publisher" => metadata.publisher = Some(text),
            "Genre" => metadata.subject = Some(text),
            "Summary" => metadata.description = Some(text),
            "LanguageISO" => metadata.language = Some(text),
            "GTIN" => metadata.identifier = Some(text),
            _ => {}
        }
    }

    Ok(())
}

/// Read comic archive metadata.
pub(super) fn read_metadata(path: &Path) -> Result<BookMetadata> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut metadata = BookMetadata {
        has_cover: !get_image_files(&archive).is_empty(),
        ..Default::default()
    };
    metadata.has_thumbnail = metadata.has_cover;

    if let Ok(mut info) = archive.by_name("ComicInfo.xml") {
        let mut content = String::new();
        info.read_to_string(&mut content)?;
        if let Err(e) = apply_comic_info(&content, &mut metadata) {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring invalid ComicInfo.xml");
        }
    }

    Ok(metadata)
}

/// The first page is the cover.
pub(super) fn extract_cover(path: &Path) -> Result<Option<Vec<u8>>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let images = get_image_files(&archive);
    let Some(first_image) = images.first() else {
        return Ok(None);
    };

    let mut data = Vec::new();
    archive.by_name(first_image)?.read_to_end(&mut data)?;

    Ok(Some(data))
}

/// Natural string comparison for sorting.
fn natord_compare(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek(), b_chars.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ac), Some(&bc)) => {
                if ac.is_ascii_digit() && bc.is_ascii_digit() {
                    let a_num = take_number(&mut a_chars);
                    let b_num = take_number(&mut b_chars);

                    match a_num.cmp(&b_num) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                } else {
                    a_chars.next();
                    b_chars.next();

                    match ac.to_lowercase().cmp(bc.to_lowercase()) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
            }
        }
    }
}

/// Consume a run of ASCII digits.
fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut value: u64 = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(u64::from(digit));
        chars.next();
    }
    value
}

//! EPUB format reader.

use super::{BookMetadata, non_empty};
use crate::error::{AppError, Result};
use roxmltree::{Document, Node};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Parsed OPF package: metadata plus the declared cover href.
struct Package {
    metadata: BookMetadata,
    cover_href: Option<String>,
}

/// Find the OPF file path from container.xml.
fn find_opf_path(archive: &mut ZipArchive<File>) -> Result<String> {
    let mut container = archive.by_name("META-INF/container.xml")?;
    let mut content = String::new();
    container.read_to_string(&mut content)?;

    let doc = Document::parse(&content)?;

    doc.descendants()
        .find(|n| n.has_tag_name("rootfile"))
        .and_then(|n| n.attribute("full-path"))
        .map(String::from)
        .ok_or_else(|| AppError::InvalidFormat("No rootfile in container.xml".into()))
}

/// Open the archive and read the OPF document.
///
/// Returns the archive (so callers can keep reading items), the directory
/// of the OPF inside the archive and its content.
fn open_package(path: &Path) -> Result<(ZipArchive<File>, String, String)> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let opf_path = find_opf_path(&mut archive)?;
    let opf_dir = opf_path
        .rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default();

    let mut opf_content = String::new();
    archive
        .by_name(&opf_path)?
        .read_to_string(&mut opf_content)?;

    Ok((archive, opf_dir, opf_content))
}

fn text_of(node: Node) -> Option<String> {
    node.text().and_then(non_empty)
}

/// Parse the OPF document.
fn parse_opf(content: &str) -> Result<Package> {
    let doc = Document::parse(content)?;
    let mut metadata = BookMetadata::default();
    let mut subjects: Vec<String> = Vec::new();
    let mut cover_id: Option<String> = None;

    let Some(meta_root) = doc.descendants().find(|n| n.has_tag_name("metadata")) else {
        return Err(AppError::InvalidFormat("No metadata in package".into()));
    };

    // First occurrence wins for single-valued fields.
    for node in meta_root.descendants().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "title" if metadata.title.is_none() => metadata.title = text_of(node),
            "language" if metadata.language.is_none() => metadata.language = text_of(node),
            "identifier" if metadata.identifier.is_none() => metadata.identifier = text_of(node),
            "creator" if metadata.creator.is_none() => metadata.creator = text_of(node),
            "contributor" if metadata.contributor.is_none() => {
                metadata.contributor = text_of(node)
            }
            "publisher" if metadata.publisher.is_none() => metadata.publisher = text_of(node),
            "description" if metadata.description.is_none() => {
                // Keep inner whitespace: the catalog decides how to render it.
                metadata.description = node
                    .text()
                    .filter(|t| !t.trim().is_empty())
                    .map(String::from)
            }
            "subject" => subjects.extend(text_of(node)),
            "meta" => {
                if node.attribute("name") == Some("cover") && cover_id.is_none() {
                    cover_id = node.attribute("content").map(String::from);
                }
            }
            _ => {}
        }
    }

    if !subjects.is_empty() {
        metadata.subject = Some(subjects.join(", "));
    }

    let items = || {
        doc.descendants().filter(|n| {
            n.has_tag_name("item") && n.parent().is_some_and(|p| p.has_tag_name("manifest"))
        })
    };

    // EPUB 2 <meta name="cover">, then EPUB 3 properties="cover-image".
    let cover_href = cover_id
        .as_deref()
        .and_then(|id| items().find(|n| n.attribute("id") == Some(id)))
        .or_else(|| {
            items().find(|n| {
                n.attribute("properties")
                    .is_some_and(|p| p.split_whitespace().any(|p| p == "cover-image"))
            })
        })
        .and_then(|n| n.attribute("href"))
        .map(String::from);

    Ok(Package {
        metadata,
        cover_href,
    })
}

/// Resolve a manifest href against the OPF directory into an archive path.
fn resolve_href(opf_dir: &str, href: &str) -> String {
    let href = urlencoding::decode(href)
        .map(|h| h.into_owned())
        .unwrap_or_else(|_| href.to_string());
    let href = href.split('#').next().unwrap_or_default();

    let mut parts: Vec<&str> = opf_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Read EPUB metadata.
pub(super) fn read_metadata(path: &Path) -> Result<BookMetadata> {
    let (archive, opf_dir, opf_content) = open_package(path)?;
    let Package {
        mut metadata,
        cover_href,
    } = parse_opf(&opf_content)?;

    metadata.has_cover = cover_href
        .map(|href| archive.index_for_name(&resolve_href(&opf_dir, &href)).is_some())
        .unwrap_or(false);
    metadata.has_thumbnail = metadata.has_cover;

    Ok(metadata)
}

/// Extract the declared cover item bytes.
pub(super) fn extract_cover(path: &Path) -> Result<Option<Vec<u8>>> {
    let (mut archive, opf_dir, opf_content) = open_package(path)?;
    let Some(href) = parse_opf(&opf_content)?.cover_href else {
        return Ok(None);
    };

    let mut data = Vec::new();
    archive
        .by_name(&resolve_href(&opf_dir, &href))?
        .read_to_end(&mut data)?;

    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EpubFixture, png_bytes};

    const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title> The Dispossessed </dc:title>
    <dc:creator>Ursula K. Le Guin</dc:creator>
    <dc:creator>Someone Else</dc:creator>
    <dc:language>en</dc:language>
    <dc:subject>Science fiction</dc:subject>
    <dc:subject>Utopia</dc:subject>
    <dc:description>An ambiguous utopia.</dc:description>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="cover-img" href="../Images/cover%20art.png" media-type="image/png"/>
  </manifest>
</package>"#;

    #[test]
    fn parse_opf_reads_first_values() {
        let package = parse_opf(OPF).unwrap();
        let m = package.metadata;
        assert_eq!(m.title.as_deref(), Some("The Dispossessed"));
        assert_eq!(m.creator.as_deref(), Some("Ursula K. Le Guin"));
        assert_eq!(m.language.as_deref(), Some("en"));
        assert_eq!(m.subject.as_deref(), Some("Science fiction, Utopia"));
        assert_eq!(m.description.as_deref(), Some("An ambiguous utopia."));
        assert_eq!(package.cover_href.as_deref(), Some("../Images/cover%20art.png"));
    }

    #[test]
    fn parse_opf_epub3_cover_property() {
        let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata><title xmlns="http://purl.org/dc/elements/1.1/">T</title></metadata>
  <manifest>
    <item id="c" href="img/c.jpg" properties="cover-image" media-type="image/jpeg"/>
  </manifest>
</package>"#;
        let package = parse_opf(opf).unwrap();
        assert_eq!(package.cover_href.as_deref(), Some("img/c.jpg"));
    }

    #[test]
    fn parse_opf_without_cover() {
        let opf = r#"<package><metadata><title>T</title></metadata>
<manifest><item id="cover" href="cover.jpg"/></manifest></package>"#;
        let package = parse_opf(opf).unwrap();
        assert!(package.cover_href.is_none());
    }

    #[test]
    fn resolve_href_handles_relative_segments() {
        assert_eq!(
            resolve_href("OEBPS/Text", "../Images/cover%20art.png"),
            "OEBPS/Images/cover art.png"
        );
        assert_eq!(resolve_href("", "cover.jpg"), "cover.jpg");
        assert_eq!(resolve_href("OEBPS", "./img/c.jpg#frag"), "OEBPS/img/c.jpg");
    }

    #[test]
    fn read_metadata_and_cover_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        EpubFixture::new("Le Guin", "The Lathe of Heaven")
            .cover(png_bytes())
            .write(&path);

        let m = read_metadata(&path).unwrap();
        assert_eq!(m.title.as_deref(), Some("The Lathe of Heaven"));
        assert_eq!(m.creator.as_deref(), Some("Le Guin"));
        assert!(m.has_cover);
        assert!(m.has_thumbnail);

        let cover = extract_cover(&path).unwrap().unwrap();
        assert_eq!(cover, png_bytes());
    }

    #[test]
    fn declared_cover_missing_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        EpubFixture::new("A", "B").dangling_cover().write(&path);

        let m = read_metadata(&path).unwrap();
        assert!(!m.has_cover);
        assert!(extract_cover(&path).is_err());
    }
}

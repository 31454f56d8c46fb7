//! Assembly of directory listings into OPDS feeds.

use crate::error::{AppError, Result};
use crate::library::cover::COVER_TYPE;
use crate::library::node::NAVIGATION_TYPE;
use crate::library::{CatalogEntry, NodeKind};
use crate::opds::{Content, Entry, Feed, Link, TextType, rel};

/// Characters some readers choke on inside entry text.
const STRIPPED_CONTROLS: [char; 4] = ['\u{000C}', '\t', '\r', '\n'];

/// Builds catalog feeds for paths under a URL prefix.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    base_path: String,
    title: String,
}

impl CatalogBuilder {
    /// `base_path` is the URL prefix without trailing slash (may be empty).
    pub fn new(base_path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            title: title.into(),
        }
    }

    /// URL of a catalog path, each segment percent-encoded.
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_path.clone();
        for segment in segments.iter().flat_map(|s| s.split('/')) {
            if segment.is_empty() {
                continue;
            }
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        if url.is_empty() { "/".to_string() } else { url }
    }

    /// Build the feed for a directory node.
    pub fn build(&self, kind: NodeKind, path: &str, entries: &[CatalogEntry]) -> Result<Feed> {
        let content_type = kind
            .content_type()
            .ok_or_else(|| AppError::NotFound(path.to_string()))?;

        let trimmed = path.trim_matches('/');
        let id = format!("/{}", trimmed);
        let title = if trimmed.is_empty() {
            self.title.clone()
        } else {
            format!("Catalog in {}", id)
        };

        let mut feed = Feed::new(id, title, content_type);
        feed.links.push(Link::new(
            rel::START,
            format!("{}/", self.base_path),
            NAVIGATION_TYPE,
        ));
        feed.links
            .push(Link::new(rel::SELF, self.url(&[trimmed]), content_type));

        feed.entries = entries
            .iter()
            .map(|entry| self.entry(trimmed, entry))
            .collect();

        Ok(feed)
    }

    fn entry(&self, path: &str, entry: &CatalogEntry) -> Entry {
        let href = self.url(&[path, &entry.file_name]);
        let metadata = &entry.metadata;

        let mut links = vec![Link {
            title: Some(entry.name.clone()),
            ..Link::new(entry.rel, href.clone(), entry.mime_type.clone())
        }];
        if metadata.has_cover() {
            links.push(Link::new(
                rel::IMAGE,
                self.url(&[path, &entry.file_name, "cover"]),
                COVER_TYPE,
            ));
        }
        if metadata.has_thumbnail() {
            links.push(Link::new(
                rel::THUMBNAIL,
                self.url(&[path, &entry.file_name, "thumbnail"]),
                COVER_TYPE,
            ));
        }

        let summary = metadata.subject().map(normalize_summary);
        let content = match summary {
            Some(_) => None,
            None => metadata.description().map(render_description),
        };

        Entry {
            id: href,
            title: entry.name.clone(),
            updated: entry.updated,
            authors: metadata.creator().map(String::from).into_iter().collect(),
            summary,
            content,
            language: metadata.language().map(String::from),
            links,
        }
    }
}

/// Single line summary: trimmed, whitespace runs collapsed to one space.
///
/// No truncation.
pub fn normalize_summary(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !STRIPPED_CONTROLS.contains(c))
        .collect()
}

/// Render a description as an entry content body.
///
/// Text starting with `<` is HTML and keeps its line breaks as `<br/>`;
/// anything else is plain text on one line.
pub fn render_description(text: &str) -> Content {
    let text = text.trim();
    let is_html = text.starts_with('<');

    let value = if is_html {
        strip_controls(&text.replace("\r\n", "\n").replace('\n', "<br/>"))
    } else {
        strip_controls(&text.replace("\r\n", " ").replace(['\n', '\r'], " "))
    };

    Content {
        content_type: if is_html { TextType::Html } else { TextType::Text },
        value,
    }
}

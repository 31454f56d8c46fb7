//! OPDS 1.1 feed model and Atom XML serialization.

use crate::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{self, Cursor};

/// Link relations.
pub mod rel {
    /// Current feed.
    pub const SELF: &str = "self";
    /// Root of the catalog.
    pub const START: &str = "start";
    /// Another feed.
    pub const SUBSECTION: &str = "subsection";
    /// Download.
    pub const ACQUISITION: &str = "http://opds-spec.org/acquisition";
    /// Cover image.
    pub const IMAGE: &str = "http://opds-spec.org/image";
    /// Thumbnail image.
    pub const THUMBNAIL: &str = "http://opds-spec.org/image/thumbnail";
}

/// XML namespaces declared on the feed.
pub mod ns {
    /// Atom.
    pub const ATOM: &str = "http://www.w3.org/2005/Atom";
    /// Dublin Core terms.
    pub const DC: &str = "http://purl.org/dc/terms/";
    /// OpenSearch.
    pub const OPENSEARCH: &str = "http://a9.com/-/spec/opensearch/1.1/";
    /// OPDS catalog.
    pub const OPDS: &str = "http://opds-spec.org/2010/catalog";
}

/// OPDS feed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link relation type (e.g., "self", "subsection", "acquisition").
    pub rel: String,
    /// URL of the linked resource.
    pub href: String,
    /// MIME type of the linked resource.
    pub link_type: String,
    /// Optional title for the link.
    pub title: Option<String>,
}

impl Link {
    /// Link without a title.
    pub fn new(
        rel: impl Into<String>,
        href: impl Into<String>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            link_type: link_type.into(),
            title: None,
        }
    }
}

/// Atom text construct type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    /// Plain text.
    Text,
    /// Escaped HTML.
    Html,
}

impl TextType {
    fn as_str(&self) -> &'static str {
        match self {
            TextType::Text => "text",
            TextType::Html => "html",
        }
    }
}

/// Entry content body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    /// How the body is encoded.
    pub content_type: TextType,
    /// The body.
    pub value: String,
}

/// OPDS feed entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Unique identifier for the entry.
    pub id: String,
    /// Entry title.
    pub title: String,
    /// Last update timestamp.
    pub updated: DateTime<Utc>,
    /// Authors list.
    pub authors: Vec<String>,
    /// Short plain text summary.
    pub summary: Option<String>,
    /// Full content/description.
    pub content: Option<Content>,
    /// Language code, written as `dc:language`.
    pub language: Option<String>,
    /// Links associated with this entry.
    pub links: Vec<Link>,
}

/// OPDS catalog feed.
#[derive(Debug, Clone)]
pub struct Feed {
    /// Feed identifier (the requested path).
    pub id: String,
    /// Feed title.
    pub title: String,
    /// Generation time.
    pub updated: DateTime<Utc>,
    /// Navigation or acquisition content type.
    pub content_type: &'static str,
    /// Feed-level links.
    pub links: Vec<Link>,
    /// Entries in display order.
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Create an empty feed.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content_type: &'static str,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            updated: Utc::now(),
            content_type,
            links: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Serialize the feed as an Atom document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_feed(&mut writer, self).map_err(|e| AppError::Serialize(e.to_string()))?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| AppError::Serialize(e.to_string()))
    }
}

/// Atom date, e.g. `2024-01-31T18:04:05+00:00`.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn write_feed<W: io::Write>(writer: &mut Writer<W>, feed: &Feed) -> io::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ns::ATOM));
    root.push_attribute(("xmlns:dc", ns::DC));
    root.push_attribute(("xmlns:opensearch", ns::OPENSEARCH));
    root.push_attribute(("xmlns:opds", ns::OPDS));
    writer.write_event(Event::Start(root))?;

    write_text_element(writer, "title", &feed.title)?;
    write_text_element(writer, "id", &feed.id)?;
    write_text_element(writer, "updated", &format_time(&feed.updated))?;

    for link in &feed.links {
        write_link(writer, link)?;
    }

    for entry in &feed.entries {
        write_entry(writer, entry)?;
    }

    writer.write_event(Event::End(BytesEnd::new("feed")))
}

/// Write a simple text element.
fn write_text_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

/// Write a text construct with a `type` attribute.
fn write_typed_text<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text_type: TextType,
    text: &str,
) -> io::Result<()> {
    let mut elem = BytesStart::new(name);
    elem.push_attribute(("type", text_type.as_str()));
    writer.write_event(Event::Start(elem))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

/// Write a link element.
fn write_link<W: io::Write>(writer: &mut Writer<W>, link: &Link) -> io::Result<()> {
    let mut elem = BytesStart::new("link");
    elem.push_attribute(("rel", link.rel.as_str()));
    elem.push_attribute(("href", link.href.as_str()));
    elem.push_attribute(("type", link.link_type.as_str()));
    if let Some(title) = &link.title {
        elem.push_attribute(("title", title.as_str()));
    }
    writer.write_event(Event::Empty(elem))
}

/// Write an entry element.
fn write_entry<W: io::Write>(writer: &mut Writer<W>, entry: &Entry) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("entry")))?;

    write_text_element(writer, "title", &entry.title)?;
    write_text_element(writer, "id", &entry.id)?;

    for link in &entry.links {
        write_link(writer, link)?;
    }

    write_text_element(writer, "updated", &format_time(&entry.updated))?;

    for author in &entry.authors {
        writer.write_event(Event::Start(BytesStart::new("author")))?;
        write_text_element(writer, "name", author)?;
        writer.write_event(Event::End(BytesEnd::new("author")))?;
    }

    if let Some(summary) = &entry.summary {
        write_typed_text(writer, "summary", TextType::Text, summary)?;
    }

    if let Some(content) = &entry.content {
        write_typed_text(writer, "content", content.content_type, &content.value)?;
    }

    if let Some(language) = &entry.language {
        write_text_element(writer, "dc:language", language)?;
    }

    writer.write_event(Event::End(BytesEnd::new("entry")))
}

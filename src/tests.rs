use crate::config::{BookFormat, Config, LibraryConfig};
use crate::library::MimeRegistry;
use crate::library::node::{ACQUISITION_TYPE, NAVIGATION_TYPE};
use crate::opds::ns;
use crate::server::{AppState, create_router};
use crate::test_support::{EpubFixture, png_bytes};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use std::path::Path;
use tower::ServiceExt;

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl TestResponse {
    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    /// Entries of the returned feed as (title, first link href) pairs.
    fn entries(&self) -> Vec<(String, String)> {
        let xml = self.text();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        doc.descendants()
            .filter(|n| n.has_tag_name((ns::ATOM, "entry")))
            .map(|entry| {
                let title = entry
                    .children()
                    .find(|n| n.has_tag_name((ns::ATOM, "title")))
                    .and_then(|n| n.text())
                    .unwrap_or_default()
                    .to_string();
                let href = entry
                    .children()
                    .find(|n| n.has_tag_name((ns::ATOM, "link")))
                    .and_then(|n| n.attribute("href"))
                    .unwrap_or_default()
                    .to_string();
                (title, href)
            })
            .collect()
    }
}

fn config_for(root: &Path) -> Config {
    Config {
        library: LibraryConfig {
            root: root.to_path_buf(),
        },
        ..Default::default()
    }
}

async fn request(root: &Path, method: Method, uri: &str) -> TestResponse {
    let app = create_router(AppState::new(config_for(root)).unwrap());
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    TestResponse {
        status,
        content_type,
        body,
    }
}

async fn get(root: &Path, uri: &str) -> TestResponse {
    request(root, Method::GET, uri).await
}

#[tokio::test]
async fn acquisition_feed_for_directory_of_books() {
    let dir = tempfile::tempdir().unwrap();
    EpubFixture::new("Frank Herbert", "Dune").write(&dir.path().join("dune.epub"));
    std::fs::write(dir.path().join("manual.pdf"), b"not really a pdf").unwrap();

    let response = get(dir.path(), "/opds/v1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(ACQUISITION_TYPE));

    let entries = response.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], ("manual.pdf".into(), "/opds/v1/manual.pdf".into()));
    assert_eq!(entries[1], ("Dune".into(), "/opds/v1/dune.epub".into()));
}

#[tokio::test]
async fn navigation_feed_for_directory_of_directories() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Science Fiction/Dune")).unwrap();
    std::fs::create_dir(dir.path().join("Poetry")).unwrap();
    std::fs::write(dir.path().join("loose.epub"), b"x").unwrap();

    let response = get(dir.path(), "/opds/v1/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(NAVIGATION_TYPE));

    let xml = response.text();
    assert!(xml.contains(r#"<link rel="start" href="/opds/v1/""#));
    assert!(xml.contains(r#"rel="subsection""#));
    assert_eq!(
        response.entries(),
        [
            ("Poetry".to_string(), "/opds/v1/Poetry".to_string()),
            (
                "Science Fiction".to_string(),
                "/opds/v1/Science%20Fiction".to_string()
            ),
            ("loose.epub".to_string(), "/opds/v1/loose.epub".to_string()),
        ]
    );

    let nested = get(dir.path(), "/opds/v1/Science%20Fiction").await;
    assert_eq!(nested.content_type.as_deref(), Some(NAVIGATION_TYPE));
    assert!(nested.text().contains("<title>Catalog in /Science Fiction</title>"));
    assert_eq!(nested.entries().len(), 1);
}

#[tokio::test]
async fn leaf_is_streamed_raw() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("Books")).unwrap();
    std::fs::write(dir.path().join("Books/tale.fb2"), b"<FictionBook/>").unwrap();

    let response = get(dir.path(), "/opds/v1/Books/tale.fb2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("text/fb2+xml"));
    assert_eq!(response.body, b"<FictionBook/>");
}

#[tokio::test]
async fn cover_and_thumbnail_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    EpubFixture::new("A", "With cover")
        .cover(png_bytes())
        .write(&dir.path().join("with.epub"));
    EpubFixture::new("B", "Without cover").write(&dir.path().join("without.epub"));

    let feed = get(dir.path(), "/opds/v1").await.text();
    assert!(feed.contains(r#"href="/opds/v1/with.epub/cover""#));
    assert!(feed.contains(r#"href="/opds/v1/with.epub/thumbnail""#));
    assert!(!feed.contains("without.epub/cover"));

    let cover = get(dir.path(), "/opds/v1/with.epub/cover").await;
    assert_eq!(cover.status, StatusCode::OK);
    assert_eq!(cover.content_type.as_deref(), Some("image/jpeg"));
    assert!(cover.body.starts_with(&[0xFF, 0xD8, 0xFF]));

    let thumbnail = get(dir.path(), "/opds/v1/with.epub/thumbnail").await;
    assert_eq!(thumbnail.status, StatusCode::OK);
    assert_eq!(thumbnail.content_type.as_deref(), Some("image/jpeg"));

    let missing = get(dir.path(), "/opds/v1/without.epub/cover").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entry_text_from_epub_metadata() {
    let dir = tempfile::tempdir().unwrap();
    EpubFixture::new("Ursula K. Le Guin", "The Dispossessed")
        .subject("Science\n   fiction")
        .description("ignored when a subject exists")
        .write(&dir.path().join("dispossessed.epub"));
    EpubFixture::new("Frank Herbert", "Dune")
        .description("<p>Spice</p>\r\n<p>Worms</p>")
        .write(&dir.path().join("dune.epub"));

    let xml = get(dir.path(), "/opds/v1").await.text();
    assert!(xml.contains(r#"<summary type="text">Science fiction</summary>"#));
    assert!(!xml.contains("ignored when a subject exists"));
    assert!(xml.contains(
        r#"<content type="html">&lt;p&gt;Spice&lt;/p&gt;&lt;br/&gt;&lt;p&gt;Worms&lt;/p&gt;</content>"#
    ));
    assert!(xml.contains("<author><name>Frank Herbert</name></author>"));
    assert!(xml.contains("<dc:language>en</dc:language>"));
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_out_of_root_are_not_listed() {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    EpubFixture::new("Outside Author", "Outside Title")
        .write(&outside.path().join("outside.epub"));
    std::os::unix::fs::symlink(
        outside.path().join("outside.epub"),
        root.path().join("linked.epub"),
    )
    .unwrap();
    std::os::unix::fs::symlink(outside.path(), root.path().join("shelf")).unwrap();
    std::fs::write(root.path().join("local.epub"), b"x").unwrap();

    let response = get(root.path(), "/opds/v1").await;
    assert_eq!(response.content_type.as_deref(), Some(ACQUISITION_TYPE));
    assert_eq!(
        response.entries(),
        [("local.epub".to_string(), "/opds/v1/local.epub".to_string())]
    );
    let xml = response.text();
    assert!(!xml.contains("Outside Title"));
    assert!(!xml.contains("Outside Author"));
}

#[tokio::test]
async fn directory_named_cover_is_a_feed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Comics/cover")).unwrap();

    let response = get(dir.path(), "/opds/v1/Comics/cover").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(ACQUISITION_TYPE));
}

#[tokio::test]
async fn missing_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let response = get(dir.path(), "/opds/v1/nothing/here.epub").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_is_not_found() {
    let parent = tempfile::tempdir().unwrap();
    let root = parent.path().join("books");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(parent.path().join("secret.epub"), b"secret").unwrap();

    for uri in [
        "/opds/v1/..%2Fsecret.epub",
        "/opds/v1/%2E%2E/secret.epub",
        "/opds/v1/a/..%2F..%2Fsecret.epub",
    ] {
        let response = get(&root, uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", uri);
        assert_ne!(response.body, b"secret");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_out_of_root_is_not_served() {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.epub"), b"secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

    let response = get(root.path(), "/opds/v1/link/secret.epub").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let listing = get(root.path(), "/opds/v1/link").await;
    assert_eq!(listing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn head_answers_navigation_type() {
    let dir = tempfile::tempdir().unwrap();
    let response = request(dir.path(), Method::HEAD, "/opds/v1/anything").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(NAVIGATION_TYPE));
}

#[tokio::test]
async fn server_root_redirects_to_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let response = get(dir.path(), "/").await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn custom_base_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.epub"), b"x").unwrap();

    let mut config = config_for(dir.path());
    config.server.base_path = "/catalog/".to_string();
    let app = create_router(AppState::new(config).unwrap());
    let response = app
        .oneshot(Request::builder().uri("/catalog").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains(r#"href="/catalog/a.epub""#));
}

#[test]
fn missing_root_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AppState::new(config_for(&dir.path().join("missing")));
    assert!(matches!(result, Err(crate::AppError::Config(_))));
}

#[test]
fn config_parse_toml() {
    let toml = r#"
[server]
bind = "127.0.0.1:9090"
title = "Test Library"
base_path = "opds/"

[library]
root = "/srv/books"

[covers]
thumbnail_size = 150
jpeg_quality = 70

[mime.books]
azw3 = "application/vnd.amazon.ebook"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.server.bind.port(), 9090);
    assert_eq!(config.server.title, "Test Library");
    assert_eq!(config.server.normalized_base_path(), "/opds");
    assert_eq!(config.library.root, Path::new("/srv/books"));
    assert_eq!(config.covers.thumbnail_size, 150);
    assert_eq!(config.covers.jpeg_quality, 70);
    assert_eq!(
        config.mime.books.get("azw3").map(String::as_str),
        Some("application/vnd.amazon.ebook")
    );
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 8080);
    assert_eq!(config.server.normalized_base_path(), "/opds/v1");
    assert_eq!(config.library.root, Path::new("./books"));
    assert_eq!(config.covers.thumbnail_size, 200);
    assert!(config.mime.books.is_empty());
}

#[test]
fn generated_config_parses() {
    let config: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(config.server.normalized_base_path(), "/opds/v1");
}

#[test]
fn builtin_formats_are_registered() {
    let registry = MimeRegistry::default();
    for format in BookFormat::ALL {
        let name = format!("book.{}", format.extension());
        assert_eq!(registry.type_for(&name), Some(format.mime_type()));
        assert!(registry.is_book(&name));
    }
}

//! HTTP request handlers.

use crate::error::{AppError, Result};
use crate::library::node::NAVIGATION_TYPE;
use crate::library::{Image, NodeKind};
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use tokio_util::io::ReaderStream;

/// Suffix selecting the cover of a book.
const COVER_SUFFIX: &str = "/cover";

/// Suffix selecting the thumbnail of a book.
const THUMBNAIL_SUFFIX: &str = "/thumbnail";

/// Build a response, returning 500 on error (which shouldn't happen).
fn build_response(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("Internal error"))
                .unwrap_or_default()
        })
}

/// Server root, sends clients to the catalog.
pub async fn index(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.catalog.url(&[]))
}

/// Catalog root feed.
pub async fn catalog_root(State(state): State<AppState>) -> Result<Response<Body>> {
    serve_path(state, String::new()).await
}

/// Any path below the catalog root.
pub async fn catalog_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response<Body>> {
    serve_path(state, path).await
}

/// Readers probe the catalog with HEAD before fetching it.
pub async fn catalog_head() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, NAVIGATION_TYPE)])
}

/// Dispatch on what the path is on disk.
async fn serve_path(state: AppState, path: String) -> Result<Response<Body>> {
    let lookup = path.clone();
    let kind = state
        .blocking(move |library, _| library.node_kind(&lookup))
        .await?;

    match kind {
        NodeKind::Leaf => serve_file(&state, &path).await,
        NodeKind::Navigation | NodeKind::Acquisition => serve_feed(&state, kind, path).await,
        NodeKind::NotExists => {
            if let Some(book) = path.strip_suffix(COVER_SUFFIX) {
                let book = book.to_string();
                let image = state
                    .blocking(move |library, _| library.cover(&book))
                    .await?;
                image_response(image, &path)
            } else if let Some(book) = path.strip_suffix(THUMBNAIL_SUFFIX) {
                let book = book.to_string();
                let image = state
                    .blocking(move |library, _| library.thumbnail(&book))
                    .await?;
                image_response(image, &path)
            } else {
                Err(AppError::NotFound(path))
            }
        }
    }
}

/// Render a navigation or acquisition feed.
async fn serve_feed(state: &AppState, kind: NodeKind, path: String) -> Result<Response<Body>> {
    let (content_type, xml) = state
        .blocking(move |library, catalog| {
            let entries = library.list(&path);
            let feed = catalog.build(kind, &path, &entries)?;
            tracing::debug!(path = %path, entries = feed.entries.len(), "Built feed");
            Ok::<_, AppError>((feed.content_type, feed.to_xml()?))
        })
        .await??;

    Ok(build_response(StatusCode::OK, content_type, xml))
}

/// Stream a file back to the client.
async fn serve_file(state: &AppState, path: &str) -> Result<Response<Body>> {
    let lookup = path.to_string();
    let leaf = state
        .blocking(move |library, _| library.file(&lookup))
        .await??;

    // The handle lives in the body stream and closes when it is dropped.
    let file = tokio::fs::File::open(&leaf.path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let filename = leaf
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let content_disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    );

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, leaf.content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, leaf.length)
        .body(body)
        .unwrap_or_else(|_| Response::default()))
}

fn image_response(image: Option<Image>, path: &str) -> Result<Response<Body>> {
    let image = image.ok_or_else(|| AppError::NotFound(path.to_string()))?;
    Ok(build_response(StatusCode::OK, image.content_type, image.bytes))
}

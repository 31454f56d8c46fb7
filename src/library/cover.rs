//! Cover and thumbnail extraction.

use crate::config::CoverConfig;
use crate::error::Result;
use crate::formats::MetadataProvider;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::path::Path;

/// Content type of every image produced here.
pub const COVER_TYPE: &str = "image/jpeg";

/// An encoded image ready to be served.
#[derive(Debug, Clone)]
pub struct Image {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub content_type: &'static str,
}

/// Re-encode any decodable image as JPEG.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)))?;
    Ok(bytes)
}

fn decode_cover(path: &Path, mime: &str) -> Result<Option<DynamicImage>> {
    let Some(provider) = MetadataProvider::for_mime(mime) else {
        return Ok(None);
    };
    let Some(raw) = provider.cover_bytes(path)? else {
        return Ok(None);
    };
    Ok(Some(image::load_from_memory(&raw)?))
}

/// Log a failure and turn it into "no image".
fn or_none(path: &Path, what: &str, result: Result<Option<Vec<u8>>>) -> Option<Image> {
    match result {
        Ok(Some(bytes)) => Some(Image {
            bytes,
            content_type: COVER_TYPE,
        }),
        Ok(None) => {
            tracing::debug!(path = %path.display(), "No {} declared", what);
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to extract {}", what);
            None
        }
    }
}

/// Extract the cover of a book as JPEG.
pub fn cover(path: &Path, mime: &str, config: &CoverConfig) -> Option<Image> {
    let result = decode_cover(path, mime).and_then(|img| {
        img.map(|img| encode_jpeg(&img, config.jpeg_quality))
            .transpose()
    });
    or_none(path, "cover", result)
}

/// Fit an image inside `width` x `height`. Never upscales.
fn shrink(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.width() <= width && img.height() <= height {
        img
    } else {
        img.thumbnail(width, height)
    }
}

/// Render a downscaled cover as JPEG.
pub fn thumbnail(path: &Path, mime: &str, config: &CoverConfig) -> Option<Image> {
    let size = config.thumbnail_size.max(1);
    let result = decode_cover(path, mime).and_then(|img| {
        img.map(|img| {
            let small = shrink(img, size, size.saturating_mul(2));
            encode_jpeg(&small, config.jpeg_quality)
        })
        .transpose()
    });
    or_none(path, "thumbnail", result)
}

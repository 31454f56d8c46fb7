//! Fixtures shared by unit tests.

use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A tiny valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 6, image::Rgba([200, 30, 30, 255]));
    let mut data = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
        .unwrap();
    data
}

/// A tiny baseline JPEG.
pub fn jpeg_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(6, 8, image::Rgb([30, 30, 200]));
    let mut data = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Jpeg)
        .unwrap();
    data
}

/// Write a one page PDF with an Info dictionary, optionally drawing a
/// DCT encoded image on the page.
pub fn write_pdf(path: &Path, title: &str, author: &str, jpeg: Option<&[u8]>) {
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut resources = lopdf::Dictionary::new();
    if let Some(jpeg) = jpeg {
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 6,
                "Height" => 8,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.to_vec(),
        );
        let image_id = doc.add_object(image);
        resources.set("XObject", dictionary! { "Im0" => image_id });
    }

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 60.into(), 80.into()],
        "Resources" => resources,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Author" => Object::string_literal(author),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.save(path).unwrap();
}

/// Write a stored (uncompressed) zip archive.
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// Builder for minimal EPUB files.
pub struct EpubFixture {
    creator: String,
    title: String,
    description: Option<String>,
    subject: Option<String>,
    cover: Option<Vec<u8>>,
    dangling_cover: bool,
}

impl EpubFixture {
    pub fn new(creator: &str, title: &str) -> Self {
        Self {
            creator: creator.to_string(),
            title: title.to_string(),
            description: None,
            subject: None,
            cover: None,
            dangling_cover: false,
        }
    }

    pub fn cover(mut self, data: Vec<u8>) -> Self {
        self.cover = Some(data);
        self
    }

    /// Declare a cover that is not in the archive.
    pub fn dangling_cover(mut self) -> Self {
        self.dangling_cover = true;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn subject(mut self, text: &str) -> Self {
        self.subject = Some(text.to_string());
        self
    }

    pub fn write(self, path: &Path) {
        let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

        let declares_cover = self.cover.is_some() || self.dangling_cover;
        let mut metadata = format!(
            "<dc:title>{}</dc:title><dc:creator>{}</dc:creator><dc:language>en</dc:language>",
            self.title, self.creator
        );
        if let Some(subject) = &self.subject {
            metadata.push_str(&format!("<dc:subject>{}</dc:subject>", subject));
        }
        if let Some(description) = &self.description {
            metadata.push_str(&format!(
                "<dc:description><![CDATA[{}]]></dc:description>",
                description
            ));
        }
        if declares_cover {
            metadata.push_str(r#"<meta name="cover" content="cover-image"/>"#);
        }

        let manifest = if declares_cover {
            r#"<item id="cover-image" href="images/cover.png" media-type="image/png"/>"#
        } else {
            ""
        };

        let opf = format!(
            r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">{metadata}</metadata>
  <manifest>{manifest}</manifest>
</package>"#
        );

        let mut files: Vec<(&str, &[u8])> = vec![
            ("mimetype", b"application/epub+zip".as_slice()),
            ("META-INF/container.xml", container.as_bytes()),
            ("OEBPS/content.opf", opf.as_bytes()),
        ];
        if let Some(cover) = &self.cover {
            files.push(("OEBPS/images/cover.png", cover.as_slice()));
        }

        write_zip(path, &files);
    }
}

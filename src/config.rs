use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Serve a directory tree of ebooks as an OPDS catalog.
#[derive(Parser, Debug, Clone)]
#[command(name = "opds-dir")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "OPDS_DIR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Directory with books, overrides `library.root`.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Write a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Library configuration.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Cover rendering configuration.
    #[serde(default)]
    pub covers: CoverConfig,

    /// Additional MIME registrations.
    #[serde(default)]
    pub mime: MimeConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Catalog title shown on the root feed.
    #[serde(default = "default_title")]
    pub title: String,

    /// URL prefix the catalog is mounted under.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
            base_path: default_base_path(),
        }
    }
}

impl ServerConfig {
    /// Base path without trailing slash, always starting with one.
    ///
    /// An empty or `/` base path mounts the catalog at the server root and
    /// yields an empty string.
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        8080,
    )
}

fn default_title() -> String {
    "My Library".to_string()
}

fn default_base_path() -> String {
    "/opds/v1".to_string()
}

/// Library configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory with books; every catalog path resolves inside it.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./books")
}

/// Cover configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Thumbnail width in pixels.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// JPEG quality (1-100) for covers and thumbnails.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: default_thumbnail_size(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_thumbnail_size() -> u32 {
    200
}

fn default_jpeg_quality() -> u8 {
    85
}

/// Extra extension registrations, keyed by extension without the dot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MimeConfig {
    /// Book extensions to serve, e.g. `azw3 = "application/vnd.amazon.ebook"`.
    #[serde(default)]
    pub books: BTreeMap<String, String>,

    /// Image extensions to serve.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("opds-dir.toml"),
            dirs::config_dir()
                .map(|p| p.join("opds-dir").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/opds-dir/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# opds-dir configuration

[server]
bind = "0.0.0.0:8080"
title = "My Library"
# URL prefix of the catalog
base_path = "/opds/v1"

[library]
root = "./books"

[covers]
thumbnail_size = 200
jpeg_quality = 85

# Extra extensions to list and serve
# [mime.books]
# azw3 = "application/vnd.amazon.ebook"
#
# [mime.images]
# webp = "image/webp"
"#
        .to_string()
    }
}

/// Built-in book formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFormat {
    /// EPUB format (Electronic Publication).
    Epub,
    /// PDF format (Portable Document Format).
    Pdf,
    /// CBZ format (Comic Book ZIP archive).
    Cbz,
    /// CBR format (Comic Book RAR archive).
    Cbr,
    /// MOBI format (Mobipocket eBook).
    Mobi,
    /// FB2 format (FictionBook).
    Fb2,
}

impl BookFormat {
    /// Every built-in format.
    pub const ALL: [BookFormat; 6] = [
        BookFormat::Mobi,
        BookFormat::Epub,
        BookFormat::Cbz,
        BookFormat::Cbr,
        BookFormat::Fb2,
        BookFormat::Pdf,
    ];

    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            BookFormat::Epub => "application/epub+zip",
            BookFormat::Pdf => "application/pdf",
            BookFormat::Cbz => "application/x-cbz",
            BookFormat::Cbr => "application/x-cbr",
            BookFormat::Mobi => "application/x-mobipocket-ebook",
            BookFormat::Fb2 => "text/fb2+xml",
        }
    }

    /// File extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Pdf => "pdf",
            BookFormat::Cbz => "cbz",
            BookFormat::Cbr => "cbr",
            BookFormat::Mobi => "mobi",
            BookFormat::Fb2 => "fb2",
        }
    }
}

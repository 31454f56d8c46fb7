//! opds-dir: serve a directory tree of ebooks as an OPDS catalog.
//!
//! The filesystem is the only source of truth. Every request resolves the
//! client path inside the library root, classifies it and either streams
//! the file or renders an OPDS 1.1 feed from the directory as it is now.
//!
//! # Features
//!
//! - Navigation feeds for directories of directories
//! - Acquisition feeds for directories of books
//! - Metadata from EPUB, PDF and CBZ files
//! - Cover and thumbnail extraction, served as JPEG
//! - Path traversal protection, symlinks included

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Feed assembly.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Error types.
pub mod error;
/// Book format readers.
pub mod formats;
/// Directory tree access.
pub mod library;
/// OPDS feed model and XML output.
pub mod opds;
/// HTTP server.
pub mod server;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use error::{AppError, Result};
pub use library::Library;
pub use server::AppState;

//! Application state shared across handlers.

use crate::catalog::CatalogBuilder;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::library::Library;
use std::sync::Arc;

/// Shared application state.
///
/// Everything here is immutable after startup; requests only read it.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Library directory view.
    pub library: Arc<Library>,
    /// Feed builder for the configured URL prefix.
    pub catalog: Arc<CatalogBuilder>,
}

impl AppState {
    /// Create application state, opening the configured library.
    pub fn new(config: Config) -> Result<Self> {
        let library = Library::open(&config)?;
        Ok(Self::with_library(config, library))
    }

    /// Create application state around an already opened library.
    pub fn with_library(config: Config, library: Library) -> Self {
        let catalog = CatalogBuilder::new(
            config.server.normalized_base_path(),
            config.server.title.clone(),
        );

        Self {
            config: Arc::new(config),
            library: Arc::new(library),
            catalog: Arc::new(catalog),
        }
    }

    /// Run filesystem work for a request off the async runtime.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Library, &CatalogBuilder) -> T + Send + 'static,
        T: Send + 'static,
    {
        let library = Arc::clone(&self.library);
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || f(&library, &catalog))
            .await
            .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))
    }
}

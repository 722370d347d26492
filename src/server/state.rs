//! Application state shared across handlers.

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::covers::{CoverImage, CoverResolver, CoverSource, OpenLibraryCovers};
use crate::db::Database;
use crate::error::Result;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Catalog service over the database.
    pub catalog: CatalogService,
    /// Cover image resolver.
    pub covers: CoverResolver,
}

impl AppState {
    /// Create state with an explicit cover source.
    pub fn new(config: Config, db: Database, source: Arc<dyn CoverSource>) -> Self {
        let covers = CoverResolver::new(config.covers.cache_dir.clone(), source);
        Self {
            config: Arc::new(config),
            catalog: CatalogService::new(db),
            covers,
        }
    }

    /// Create state fetching covers from the configured HTTP endpoint.
    pub fn with_remote_covers(config: Config, db: Database) -> Result<Self> {
        let source = OpenLibraryCovers::new(
            config.covers.endpoint.clone(),
            config.covers.timeout(),
        )?;
        Ok(Self::new(config, db, Arc::new(source)))
    }

    /// Resolve a cover and its display URL.
    pub async fn cover(&self, isbn: &str, title: &str) -> (CoverImage, String) {
        let cover = self.covers.resolve(isbn, title).await;
        let url = cover.url(&self.config.covers.placeholder_url);
        (cover, url)
    }

    /// Site title.
    pub fn title(&self) -> &str {
        &self.config.server.title
    }
}

//! library-catalog: a small library catalog web application.
//!
//! Authors and books live in SQLite. The web UI lists, searches and sorts
//! books, adds and deletes authors and books, and shows book covers fetched
//! from Open Library through a local file cache.
//!
//! # Features
//!
//! - Book listing with title/author search and sorting
//! - Author and book forms with duplicate detection
//! - Cascading deletes in both directions (author to books, last book to author)
//! - Cover images cached on disk, with a placeholder fallback
//! - CLI for managing the catalog without the web UI

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Catalog service rules.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Cover image resolution and caching.
pub mod covers;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// HTTP server.
pub mod server;


pub use catalog::CatalogService;
pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Library catalog web application.
#[derive(Parser, Debug, Clone)]
#[command(name = "library-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "LIBRARY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file).
    #[arg(long, env = "LIBRARY_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Author management commands.
    Author {
        /// Author subcommand action.
        #[command(subcommand)]
        action: AuthorCommand,
    },

    /// Book management commands.
    Book {
        /// Book subcommand action.
        #[command(subcommand)]
        action: BookCommand,
    },

    /// Create a default config file and the database.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Author management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AuthorCommand {
    /// Add a new author.
    Add {
        /// Author name.
        name: String,
        /// Birth date (YYYY-MM-DD).
        #[arg(long)]
        born: Option<chrono::NaiveDate>,
        /// Date of death (YYYY-MM-DD).
        #[arg(long)]
        died: Option<chrono::NaiveDate>,
    },

    /// Delete an author and all of their books.
    Del {
        /// Author ID.
        id: i64,
    },

    /// List all authors.
    List,
}

/// Book management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BookCommand {
    /// Add a new book.
    Add {
        /// ISBN.
        #[arg(long)]
        isbn: String,
        /// Title.
        #[arg(long)]
        title: String,
        /// Publication year.
        #[arg(long)]
        year: i32,
        /// Owning author ID.
        #[arg(long)]
        author_id: i64,
    },

    /// Delete a book (removes the author too if it was their last book).
    Del {
        /// Book ID.
        id: i64,
    },

    /// List books.
    List {
        /// Sort order: "title" or "author".
        #[arg(long, default_value = "title")]
        sort_by: String,
        /// Case-insensitive title/author filter.
        #[arg(long)]
        search: Option<String>,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cover image configuration.
    #[serde(default)]
    pub covers: CoverConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Site title shown in page headers.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
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
    "Library".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/library.sqlite")
}

/// Cover image configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Directory holding cached cover files.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Remote cover URL template; `{isbn}` is substituted.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Image shown when no cover is available.
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,

    /// Timeout for the remote fetch in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            endpoint: default_endpoint(),
            placeholder_url: default_placeholder_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CoverConfig {
    /// Remote fetch timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/covers")
}

fn default_endpoint() -> String {
    "https://covers.openlibrary.org/b/isbn/{isbn}-M.jpg".to_string()
}

fn default_placeholder_url() -> String {
    crate::covers::PLACEHOLDER_ROUTE.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> crate::error::Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })?;

        if !config.covers.endpoint.contains("{isbn}") {
            return Err(crate::error::AppError::Config(
                "covers.endpoint must contain an {isbn} placeholder".to_string(),
            ));
        }

        Ok(config)
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("library-catalog.toml"),
            dirs::config_dir()
                .map(|p| p.join("library-catalog").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/library-catalog/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# library-catalog configuration

[server]
bind = "0.0.0.0:8080"
title = "Library"

[database]
path = "data/library.sqlite"

[covers]
cache_dir = "data/covers"
# Remote cover service; {isbn} is replaced with the book's ISBN
endpoint = "https://covers.openlibrary.org/b/isbn/{isbn}-M.jpg"
# Image shown when no cover is available; the default is served by the app
placeholder_url = "/static/placeholder.svg"
timeout_seconds = 10
"#
        .to_string()
    }
}

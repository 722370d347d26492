//! library-catalog server entry point.

use clap::Parser;
use library_catalog::{
    catalog::CatalogService,
    config::{AuthorCommand, BookCommand, Cli, Command, Config},
    db::{Database, SortBy},
    server,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let mut config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    if let Some(database) = cli.database {
        config.database.path = database;
    }

    // Handle command
    match cli.command {
        Some(Command::Init { force }) => cmd_init(force, &config),
        Some(Command::Author { action }) => cmd_author(action, &config),
        Some(Command::Book { action }) => cmd_book(action, &config),
        Some(Command::Serve { bind }) => cmd_serve(config, bind).await,
        None => {
            // Default: start server
            cmd_serve(config, None).await
        }
    }
}

/// Initialize config and database.
fn cmd_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    std::fs::create_dir_all(&config.covers.cache_dir)?;
    println!("Cover cache: {}", config.covers.cache_dir.display());

    println!("\nEdit config.toml to configure your server.");
    println!("Then run: library-catalog author add \"<name>\"");

    Ok(())
}

/// Author management commands.
fn cmd_author(action: AuthorCommand, config: &Config) -> anyhow::Result<()> {
    let catalog = CatalogService::new(Database::open(&config.database.path)?);

    match action {
        AuthorCommand::Add { name, born, died } => {
            let author = catalog.add_author(&name, born, died)?;
            println!("Added author: {} (id: {})", author.name, author.id);
        }

        AuthorCommand::Del { id } => {
            let deleted = catalog.delete_author(id)?;
            println!(
                "Deleted author: {} ({} books removed)",
                deleted.author.name, deleted.books_removed
            );
        }

        AuthorCommand::List => {
            let authors = catalog.authors()?;
            if authors.is_empty() {
                println!("No authors found.");
            } else {
                println!("{:<6} {:<40} {:<12} DIED", "ID", "NAME", "BORN");
                println!("{}", "-".repeat(72));
                for author in authors {
                    let fmt = |d: Option<chrono::NaiveDate>| {
                        d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
                    };
                    println!(
                        "{:<6} {:<40} {:<12} {}",
                        author.id,
                        author.name,
                        fmt(author.birth_date),
                        fmt(author.date_of_death)
                    );
                }
            }
        }
    }

    Ok(())
}

/// Book management commands.
fn cmd_book(action: BookCommand, config: &Config) -> anyhow::Result<()> {
    let catalog = CatalogService::new(Database::open(&config.database.path)?);

    match action {
        BookCommand::Add {
            isbn,
            title,
            year,
            author_id,
        } => {
            let book = catalog.add_book(&isbn, &title, year, author_id)?;
            println!("Added book: {} (id: {})", book.title, book.id);
        }

        BookCommand::Del { id } => {
            let deleted = catalog.delete_book(id)?;
            println!("Deleted book: {}", deleted.book.title);
            if let Some(author) = deleted.removed_author {
                println!("Deleted author with no remaining books: {}", author.name);
            }
        }

        BookCommand::List { sort_by, search } => {
            let books =
                catalog.list_books(SortBy::coerce(&sort_by), search.as_deref().unwrap_or(""))?;
            if books.is_empty() {
                println!("No books found.");
            } else {
                println!("{:<6} {:<15} {:<40} {:<6} AUTHOR", "ID", "ISBN", "TITLE", "YEAR");
                println!("{}", "-".repeat(90));
                for b in books {
                    println!(
                        "{:<6} {:<15} {:<40} {:<6} {}",
                        b.book.id, b.book.isbn, b.book.title, b.book.publication_year, b.author_name
                    );
                }
            }
        }
    }

    Ok(())
}

/// Start the server.
async fn cmd_serve(mut config: Config, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    // Override bind address if specified
    if let Some(addr) = bind {
        config.server.bind = addr;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_catalog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::open(&config.database.path)?;

    tracing::info!(
        bind = %config.server.bind,
        database = %config.database.path.display(),
        covers = %config.covers.cache_dir.display(),
        "Starting library-catalog server"
    );

    let counts = db.counts()?;
    tracing::info!(
        authors = counts.authors,
        books = counts.books,
        "Catalog loaded"
    );

    let bind = config.server.bind;
    let state = server::AppState::with_remote_covers(config, db)?;
    let app = server::create_router(state);

    let listener = TcpListener::bind(bind).await?;
    tracing::info!(address = %bind, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

mod schema;

pub use schema::Database;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Catalog author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Surrogate ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Birth date, if known.
    pub birth_date: Option<NaiveDate>,
    /// Date of death; `None` means alive or unknown.
    pub date_of_death: Option<NaiveDate>,
}

/// Catalog book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Surrogate ID.
    pub id: i64,
    /// ISBN (application-level duplicate key).
    pub isbn: String,
    /// Title.
    pub title: String,
    /// Year of publication.
    pub publication_year: i32,
    /// Owning author.
    pub author_id: i64,
}

/// Book joined with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookListing {
    /// The book row.
    #[serde(flatten)]
    pub book: Book,
    /// Name of the owning author.
    pub author_name: String,
}

/// Values for a new author row.
#[derive(Debug, Clone, Default)]
pub struct NewAuthor {
    /// Display name.
    pub name: String,
    /// Birth date.
    pub birth_date: Option<NaiveDate>,
    /// Date of death.
    pub date_of_death: Option<NaiveDate>,
}

/// Values for a new book row.
#[derive(Debug, Clone)]
pub struct NewBook {
    /// ISBN.
    pub isbn: String,
    /// Title.
    pub title: String,
    /// Year of publication.
    pub publication_year: i32,
    /// Owning author.
    pub author_id: i64,
}

/// Outcome of deleting a single book.
#[derive(Debug, Clone)]
pub struct DeletedBook {
    /// The removed book.
    pub book: Book,
    /// The author, if the book was their last one and they were removed too.
    pub removed_author: Option<Author>,
}

/// Outcome of deleting an author.
#[derive(Debug, Clone)]
pub struct DeletedAuthor {
    /// The removed author.
    pub author: Author,
    /// Number of books removed with them.
    pub books_removed: usize,
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// By book title.
    #[default]
    Title,
    /// By author name.
    Author,
}

impl SortBy {
    /// Parse a user-supplied sort key; anything unknown falls back to title.
    pub fn coerce(value: &str) -> Self {
        match value {
            "author" => SortBy::Author,
            _ => SortBy::Title,
        }
    }

    /// Query-string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::Author => "author",
        }
    }
}

/// Row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    /// Number of authors.
    pub authors: usize,
    /// Number of books.
    pub books: usize,
}

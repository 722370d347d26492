//! Catalog rules on top of the store: duplicate checks, validation, search.

use crate::db::{
    Author, Book, BookListing, CatalogCounts, Database, DeletedAuthor, DeletedBook, NewAuthor,
    NewBook, SortBy,
};
use crate::error::{AppError, Result};
use chrono::NaiveDate;

/// Catalog service.
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Create a new catalog service over a store handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add an author. Names must be unique (exact match).
    pub fn add_author(
        &self,
        name: &str,
        birth_date: Option<NaiveDate>,
        date_of_death: Option<NaiveDate>,
    ) -> Result<Author> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Author name must not be empty".to_string(),
            ));
        }

        if self.db.get_author_by_name(name)?.is_some() {
            return Err(AppError::Conflict(format!(
                "Error: Author \"{}\" already exists.",
                name
            )));
        }

        let author = self.db.insert_author(&NewAuthor {
            name: name.to_string(),
            birth_date,
            date_of_death,
        })?;

        tracing::info!(author_id = author.id, name = %author.name, "Author added");
        Ok(author)
    }

    /// Add a book. ISBNs must be unique (exact match).
    pub fn add_book(
        &self,
        isbn: &str,
        title: &str,
        publication_year: i32,
        author_id: i64,
    ) -> Result<Book> {
        if isbn.trim().is_empty() {
            return Err(AppError::InvalidInput("ISBN must not be empty".to_string()));
        }
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Title must not be empty".to_string(),
            ));
        }

        if self.db.get_book_by_isbn(isbn)?.is_some() {
            return Err(AppError::Conflict(format!(
                "Error: A book with ISBN \"{}\" already exists.",
                isbn
            )));
        }

        let book = self.db.insert_book(&NewBook {
            isbn: isbn.to_string(),
            title: title.to_string(),
            publication_year,
            author_id,
        })?;

        tracing::info!(book_id = book.id, isbn = %book.isbn, title = %book.title, "Book added");
        Ok(book)
    }

    /// Delete a book; the author goes too if this was their last book.
    pub fn delete_book(&self, book_id: i64) -> Result<DeletedBook> {
        let deleted = self
            .db
            .delete_book(book_id)?
            .ok_or_else(|| AppError::NotFound(format!("Book {}", book_id)))?;

        tracing::info!(
            book_id,
            title = %deleted.book.title,
            author_removed = deleted.removed_author.is_some(),
            "Book deleted"
        );
        Ok(deleted)
    }

    /// Delete an author and every book they own.
    pub fn delete_author(&self, author_id: i64) -> Result<DeletedAuthor> {
        let deleted = self
            .db
            .delete_author(author_id)?
            .ok_or_else(|| AppError::NotFound(format!("Author {}", author_id)))?;

        tracing::info!(
            author_id,
            name = %deleted.author.name,
            books_removed = deleted.books_removed,
            "Author deleted"
        );
        Ok(deleted)
    }

    /// Get author by ID.
    pub fn author(&self, author_id: i64) -> Result<Author> {
        self.db
            .get_author(author_id)?
            .ok_or_else(|| AppError::NotFound(format!("Author {}", author_id)))
    }

    /// Get book by ID.
    pub fn book(&self, book_id: i64) -> Result<BookListing> {
        self.db
            .get_book(book_id)?
            .ok_or_else(|| AppError::NotFound(format!("Book {}", book_id)))
    }

    /// All authors by name.
    pub fn authors(&self) -> Result<Vec<Author>> {
        self.db.list_authors()
    }

    /// Books of one author by title.
    pub fn books_by_author(&self, author_id: i64) -> Result<Vec<Book>> {
        self.db.books_by_author(author_id)
    }

    /// Row counts.
    pub fn counts(&self) -> Result<CatalogCounts> {
        self.db.counts()
    }

    /// List books, optionally filtered by a case-insensitive title/author substring.
    pub fn list_books(&self, sort_by: SortBy, search: &str) -> Result<Vec<BookListing>> {
        let books = self.db.list_books(sort_by)?;

        let query = search.to_lowercase();
        if query.is_empty() {
            return Ok(books);
        }

        Ok(books
            .into_iter()
            .filter(|b| {
                b.book.title.to_lowercase().contains(&query)
                    || b.author_name.to_lowercase().contains(&query)
            })
            .collect())
    }
}

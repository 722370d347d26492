use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::sync::Arc;

const BOOK_LISTING_SELECT: &str = "SELECT b.id, b.isbn, b.title, b.publication_year, b.author_id, a.name
     FROM books b JOIN authors a ON a.id = b.author_id";

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                birth_date TEXT,
                date_of_death TEXT
            );

            -- isbn is deliberately not UNIQUE; duplicates are rejected by the catalog
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                isbn TEXT NOT NULL,
                title TEXT NOT NULL,
                publication_year INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name);
            CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id);
            CREATE INDEX IF NOT EXISTS idx_books_isbn ON books(isbn);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== AUTHOR OPERATIONS ==========

    /// Insert an author and return the stored row.
    pub fn insert_author(&self, author: &NewAuthor) -> Result<Author> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO authors (name, birth_date, date_of_death) VALUES (?1, ?2, ?3)",
            params![author.name, author.birth_date, author.date_of_death],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create author: {}", e)))?;

        Ok(Author {
            id: conn.last_insert_rowid(),
            name: author.name.clone(),
            birth_date: author.birth_date,
            date_of_death: author.date_of_death,
        })
    }

    /// Get author by ID.
    pub fn get_author(&self, id: i64) -> Result<Option<Author>> {
        let conn = self.conn.lock();
        Self::find_author(&conn, id)
    }

    /// Get author by exact (case-sensitive) name.
    pub fn get_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, birth_date, date_of_death FROM authors WHERE name = ?1",
            params![name],
            Self::row_to_author,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get author: {}", e)))
    }

    /// List all authors ordered by name.
    pub fn list_authors(&self) -> Result<Vec<Author>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, birth_date, date_of_death FROM authors ORDER BY name, id")
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let authors = stmt
            .query_map([], Self::row_to_author)
            .map_err(|e| AppError::Internal(format!("Failed to list authors: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect authors: {}", e)))?;

        Ok(authors)
    }

    /// Delete an author together with all of their books.
    ///
    /// Runs in one transaction; returns `None` if the author does not exist.
    pub fn delete_author(&self, id: i64) -> Result<Option<DeletedAuthor>> {
        let mut conn = self.conn.lock();
        let tx = Self::begin(&mut conn)?;

        let Some(author) = Self::find_author(&tx, id)? else {
            return Ok(None);
        };

        let books_removed = tx
            .execute("DELETE FROM books WHERE author_id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete books: {}", e)))?;

        tx.execute("DELETE FROM authors WHERE id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete author: {}", e)))?;

        Self::commit(tx)?;

        Ok(Some(DeletedAuthor {
            author,
            books_removed,
        }))
    }

    fn find_author(conn: &Connection, id: i64) -> Result<Option<Author>> {
        conn.query_row(
            "SELECT id, name, birth_date, date_of_death FROM authors WHERE id = ?1",
            params![id],
            Self::row_to_author,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get author: {}", e)))
    }

    fn row_to_author(row: &rusqlite::Row<'_>) -> rusqlite::Result<Author> {
        Ok(Author {
            id: row.get(0)?,
            name: row.get(1)?,
            birth_date: row.get(2)?,
            date_of_death: row.get(3)?,
        })
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert a book and return the stored row.
    ///
    /// A missing author surfaces as `NotFound` via the foreign key.
    pub fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books (isbn, title, publication_year, author_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                book.isbn,
                book.title,
                book.publication_year,
                book.author_id,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                AppError::NotFound(format!("Author {} does not exist", book.author_id))
            }
            e => AppError::Internal(format!("Failed to create book: {}", e)),
        })?;

        Ok(Book {
            id: conn.last_insert_rowid(),
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            publication_year: book.publication_year,
            author_id: book.author_id,
        })
    }

    /// Get book by ID, joined with its author's name.
    pub fn get_book(&self, id: i64) -> Result<Option<BookListing>> {
        let conn = self.conn.lock();
        Self::find_book(&conn, id)
    }

    /// Get the first book with an exact ISBN match.
    pub fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, isbn, title, publication_year, author_id
             FROM books WHERE isbn = ?1 ORDER BY id LIMIT 1",
            params![isbn],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// Books owned by an author, ordered by title.
    pub fn books_by_author(&self, author_id: i64) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, isbn, title, publication_year, author_id
                 FROM books WHERE author_id = ?1 ORDER BY title, id",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![author_id], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to get author books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// All books joined with author names, in the given order.
    pub fn list_books(&self, sort_by: SortBy) -> Result<Vec<BookListing>> {
        let order = match sort_by {
            SortBy::Title => "b.title, b.id",
            SortBy::Author => "a.name, b.title, b.id",
        };
        let sql = format!("{} ORDER BY {}", BOOK_LISTING_SELECT, order);

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map([], Self::row_to_listing)
            .map_err(|e| AppError::Internal(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Delete a book, then the author if no books of theirs remain.
    ///
    /// Both steps share one transaction; returns `None` if the book does not exist.
    pub fn delete_book(&self, id: i64) -> Result<Option<DeletedBook>> {
        let mut conn = self.conn.lock();
        let tx = Self::begin(&mut conn)?;

        let Some(listing) = Self::find_book(&tx, id)? else {
            return Ok(None);
        };
        let book = listing.book;

        tx.execute("DELETE FROM books WHERE id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete book: {}", e)))?;

        let remaining: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM books WHERE author_id = ?1",
                params![book.author_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Internal(format!("Failed to count books: {}", e)))?;

        let removed_author = if remaining == 0 {
            let author = Self::find_author(&tx, book.author_id)?;
            tx.execute(
                "DELETE FROM authors WHERE id = ?1",
                params![book.author_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete author: {}", e)))?;
            author
        } else {
            None
        };

        Self::commit(tx)?;

        Ok(Some(DeletedBook {
            book,
            removed_author,
        }))
    }

    /// Number of authors and books.
    pub fn counts(&self) -> Result<CatalogCounts> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT (SELECT COUNT(*) FROM authors), (SELECT COUNT(*) FROM books)",
            [],
            |row| {
                Ok(CatalogCounts {
                    authors: row.get::<_, i64>(0)? as usize,
                    books: row.get::<_, i64>(1)? as usize,
                })
            },
        )
        .map_err(|e| AppError::Internal(format!("Failed to count rows: {}", e)))
    }

    fn find_book(conn: &Connection, id: i64) -> Result<Option<BookListing>> {
        let sql = format!("{} WHERE b.id = ?1", BOOK_LISTING_SELECT);
        conn.query_row(&sql, params![id], Self::row_to_listing)
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            isbn: row.get(1)?,
            title: row.get(2)?,
            publication_year: row.get(3)?,
            author_id: row.get(4)?,
        })
    }

    fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookListing> {
        Ok(BookListing {
            book: Self::row_to_book(row)?,
            author_name: row.get(5)?,
        })
    }

    // ========== TRANSACTIONS ==========

    fn begin(conn: &mut Connection) -> Result<Transaction<'_>> {
        conn.transaction()
            .map_err(|e| AppError::Internal(format!("Failed to begin transaction: {}", e)))
    }

    fn commit(tx: Transaction<'_>) -> Result<()> {
        tx.commit()
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))
    }
}

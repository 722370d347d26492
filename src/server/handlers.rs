//! HTTP request handlers.

use crate::covers::PLACEHOLDER_SVG;
use crate::db::SortBy;
use crate::error::{AppError, ErrorMessage, Result};
use crate::server::AppState;
use crate::server::pages::{self, BookCard, Flash, FlashLevel};
use axum::{
    Form, Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Flash message carried on a redirect target.
#[derive(Debug, Default, Deserialize)]
pub struct FlashParams {
    message: Option<String>,
    level: Option<String>,
}

impl FlashParams {
    fn into_flash(self) -> Option<Flash> {
        let message = self.message.filter(|m| !m.is_empty())?;
        Some(Flash {
            level: FlashLevel::parse(self.level.as_deref().unwrap_or_default()),
            message,
        })
    }
}

/// Redirect to `path` with a flash message attached.
fn redirect_with(path: &str, level: FlashLevel, message: &str) -> Redirect {
    Redirect::to(&format!(
        "{}?message={}&level={}",
        path,
        urlencoding::encode(message),
        level.as_str()
    ))
}

/// Turn rejected input into a flash redirect; everything else propagates.
fn reject_or_fail(path: &str, err: AppError) -> Result<Redirect> {
    match err {
        AppError::Conflict(_) | AppError::InvalidInput(_) | AppError::NotFound(_) => {
            Ok(redirect_with(path, FlashLevel::Danger, &err.to_string()))
        }
        other => Err(other),
    }
}

/// Parse an optional `YYYY-MM-DD` form value.
fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::InvalidInput(format!("{} must be YYYY-MM-DD, got \"{}\"", field, v))
            }),
    }
}

/// Parse a required integer form value.
fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        AppError::InvalidInput(format!("{} must be a number, got \"{}\"", field, value))
    })
}

/// Re-render error pages with the configured site title.
pub async fn titled_error_page(
    State(state): State<AppState>,
    mut response: Response,
) -> Response {
    if let Some(ErrorMessage(message)) = response.extensions_mut().remove::<ErrorMessage>() {
        let page = pages::error_page(state.title(), response.status(), &message);
        response.headers_mut().remove(header::CONTENT_LENGTH);
        *response.body_mut() = Body::from(page);
    }
    response
}

/// Bundled placeholder cover.
pub async fn placeholder() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], PLACEHOLDER_SVG)
}

// ============================================================================
// LISTING
// ============================================================================

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    sort_by: Option<String>,
    search: Option<String>,
}

impl ListParams {
    fn sort_by(&self) -> SortBy {
        SortBy::coerce(self.sort_by.as_deref().unwrap_or("title"))
    }

    fn search(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}

/// Home page: sortable, searchable book listing.
pub async fn home(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(flash): Query<FlashParams>,
) -> Result<Html<String>> {
    let sort_by = params.sort_by();
    let books = state.catalog.list_books(sort_by, params.search())?;

    let mut cards = Vec::with_capacity(books.len());
    for listing in &books {
        let (_, cover_url) = state.cover(&listing.book.isbn, &listing.book.title).await;
        cards.push(BookCard {
            listing,
            cover_url,
        });
    }

    Ok(Html(pages::home(
        state.title(),
        &cards,
        sort_by,
        params.search(),
        flash.into_flash().as_ref(),
    )))
}

/// Book in the JSON listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiBook {
    /// Book ID.
    pub id: i64,
    /// ISBN.
    pub isbn: String,
    /// Title.
    pub title: String,
    /// Publication year.
    pub publication_year: i32,
    /// Author ID.
    pub author_id: i64,
    /// Author name.
    pub author: String,
    /// Cover image URL.
    pub cover_image_url: String,
}

/// JSON book listing with the same sort/search semantics as the home page.
pub async fn api_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ApiBook>>> {
    let books = state
        .catalog
        .list_books(params.sort_by(), params.search())?;

    let mut result = Vec::with_capacity(books.len());
    for listing in books {
        let (_, cover_image_url) = state.cover(&listing.book.isbn, &listing.book.title).await;
        result.push(ApiBook {
            id: listing.book.id,
            isbn: listing.book.isbn,
            title: listing.book.title,
            publication_year: listing.book.publication_year,
            author_id: listing.book.author_id,
            author: listing.author_name,
            cover_image_url,
        });
    }

    Ok(Json(result))
}

/// Catalog statistics.
pub async fn api_stats(State(state): State<AppState>) -> Result<Json<crate::db::CatalogCounts>> {
    Ok(Json(state.catalog.counts()?))
}

// ============================================================================
// AUTHORS
// ============================================================================

/// Add-author form.
pub async fn add_author_form(
    State(state): State<AppState>,
    Query(flash): Query<FlashParams>,
) -> Result<Html<String>> {
    let authors = state.catalog.authors()?;
    Ok(Html(pages::add_author(
        state.title(),
        &authors,
        flash.into_flash().as_ref(),
    )))
}

/// Submitted author form.
#[derive(Debug, Deserialize)]
pub struct AuthorForm {
    name: String,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    date_of_death: Option<String>,
}

/// Create an author, then redirect back to the form with a message.
pub async fn add_author(
    State(state): State<AppState>,
    Form(form): Form<AuthorForm>,
) -> Result<Redirect> {
    const BACK: &str = "/add_author";

    let result = parse_date("Birth date", form.birth_date.as_deref())
        .and_then(|born| {
            let died = parse_date("Date of death", form.date_of_death.as_deref())?;
            Ok((born, died))
        })
        .and_then(|(born, died)| state.catalog.add_author(&form.name, born, died));

    match result {
        Ok(author) => Ok(redirect_with(
            BACK,
            FlashLevel::Success,
            &format!("Author \"{}\" added successfully!", author.name),
        )),
        Err(e) => reject_or_fail(BACK, e),
    }
}

/// Author detail page.
pub async fn author_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let author = state.catalog.author(id)?;
    let books = state.catalog.books_by_author(id)?;
    Ok(Html(pages::author_details(state.title(), &author, &books)))
}

/// Delete an author and all their books.
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    let deleted = state.catalog.delete_author(id)?;
    Ok(redirect_with(
        "/",
        FlashLevel::Success,
        &format!(
            "The author '{}' and all their books have been deleted successfully.",
            deleted.author.name
        ),
    ))
}

// ============================================================================
// BOOKS
// ============================================================================

/// Add-book form.
pub async fn add_book_form(
    State(state): State<AppState>,
    Query(flash): Query<FlashParams>,
) -> Result<Html<String>> {
    let authors = state.catalog.authors()?;
    Ok(Html(pages::add_book(
        state.title(),
        &authors,
        flash.into_flash().as_ref(),
    )))
}

/// Submitted book form.
#[derive(Debug, Deserialize)]
pub struct BookForm {
    isbn: String,
    title: String,
    publication_year: String,
    author_id: String,
}

/// Create a book, then redirect back to the form with a message.
pub async fn add_book(
    State(state): State<AppState>,
    Form(form): Form<BookForm>,
) -> Result<Redirect> {
    const BACK: &str = "/add_book";

    let result = parse_number::<i32>("Publication year", &form.publication_year)
        .and_then(|year| {
            let author_id = parse_number::<i64>("Author", &form.author_id)?;
            Ok((year, author_id))
        })
        .and_then(|(year, author_id)| {
            state
                .catalog
                .add_book(&form.isbn, &form.title, year, author_id)
        });

    match result {
        Ok(book) => Ok(redirect_with(
            BACK,
            FlashLevel::Success,
            &format!("Book \"{}\" added successfully!", book.title),
        )),
        Err(e) => reject_or_fail(BACK, e),
    }
}

/// Book detail page with cover.
pub async fn book_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let listing = state.catalog.book(id)?;
    let (cover, cover_url) = state.cover(&listing.book.isbn, &listing.book.title).await;
    Ok(Html(pages::book_details(
        state.title(),
        &listing,
        &cover,
        &cover_url,
    )))
}

/// Delete a book, removing its author too if no books of theirs remain.
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    let deleted = state.catalog.delete_book(id)?;

    let mut message = format!(
        "The book '{}' has been deleted successfully.",
        deleted.book.title
    );
    if let Some(author) = &deleted.removed_author {
        message.push_str(&format!(
            " Author '{}' had no remaining books and was removed.",
            author.name
        ));
    }

    Ok(redirect_with("/", FlashLevel::Success, &message))
}

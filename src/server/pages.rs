//! HTML page rendering.

use crate::covers::CoverImage;
use crate::db::{Author, Book, BookListing, SortBy};
use axum::http::StatusCode;
use chrono::NaiveDate;
use quick_xml::escape::escape;
use std::fmt::Write;

const STYLE: &str = r#"
        body { font-family: system-ui, sans-serif; max-width: 900px; margin: 2rem auto; padding: 0 1rem; }
        h1 { color: #333; }
        a { color: #0066cc; }
        nav a { margin-right: 1rem; }
        .flash { padding: 0.75rem 1rem; border-radius: 8px; margin: 1rem 0; }
        .flash.success { background: #e6f4ea; color: #1e4620; }
        .flash.danger { background: #fdecea; color: #611a15; }
        .books { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 1rem; }
        .book { background: #f5f5f5; padding: 0.75rem; border-radius: 8px; }
        .book img { width: 100%; height: 200px; object-fit: contain; }
        form.inline { display: inline; }
        label { display: block; margin-top: 0.5rem; }
    "#;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    /// Operation succeeded.
    Success,
    /// Operation was rejected.
    Danger,
}

impl FlashLevel {
    /// Query-string and CSS class form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
        }
    }

    /// Parse the query-string form; unknown values read as success.
    pub fn parse(value: &str) -> Self {
        match value {
            "danger" => FlashLevel::Danger,
            _ => FlashLevel::Success,
        }
    }
}

/// One-shot status message shown after a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// Severity.
    pub level: FlashLevel,
    /// Message text.
    pub message: String,
}

/// A book row with its resolved cover URL.
pub struct BookCard<'a> {
    /// Listing row.
    pub listing: &'a BookListing,
    /// Cover image URL.
    pub cover_url: String,
}

fn layout(site_title: &str, page_title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash_html = flash
        .map(|f| {
            format!(
                r#"<div class="flash {}">{}</div>"#,
                f.level.as_str(),
                escape(f.message.as_str())
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{page_title} - {site_title}</title>
    <style>{style}</style>
</head>
<body>
    <nav><a href="/">Home</a><a href="/add_author">Add author</a><a href="/add_book">Add book</a></nav>
    <h1>{page_title}</h1>
    {flash_html}
    {body}
</body>
</html>"#,
        page_title = escape(page_title),
        site_title = escape(site_title),
        style = STYLE,
        flash_html = flash_html,
        body = body,
    )
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Home page: search form and book grid.
pub fn home(
    site_title: &str,
    cards: &[BookCard<'_>],
    sort_by: SortBy,
    search: &str,
    flash: Option<&Flash>,
) -> String {
    let mut body = String::new();

    let selected = |s: SortBy| if s == sort_by { " selected" } else { "" };
    let _ = write!(
        body,
        r#"<form method="get" action="/">
        <input type="text" name="search" placeholder="Search title or author" value="{search}">
        <select name="sort_by">
            <option value="title"{title_sel}>Title</option>
            <option value="author"{author_sel}>Author</option>
        </select>
        <button type="submit">Go</button>
    </form>"#,
        search = escape(search),
        title_sel = selected(SortBy::Title),
        author_sel = selected(SortBy::Author),
    );

    if cards.is_empty() {
        body.push_str("<p>No books found.</p>");
    } else {
        body.push_str(r#"<div class="books">"#);
        for card in cards {
            let book = &card.listing.book;
            let _ = write!(
                body,
                r#"<div class="book">
            <img src="{cover}" alt="Cover of {title}">
            <p><a href="/book/{id}"><strong>{title}</strong></a></p>
            <p>by <a href="/author/{author_id}">{author}</a></p>
            <form class="inline" method="post" action="/book/{id}/delete"><button type="submit">Delete book</button></form>
        </div>"#,
                cover = escape(card.cover_url.as_str()),
                title = escape(book.title.as_str()),
                id = book.id,
                author_id = book.author_id,
                author = escape(card.listing.author_name.as_str()),
            );
        }
        body.push_str("</div>");
    }

    layout(site_title, site_title, flash, &body)
}

/// Author form and existing authors.
pub fn add_author(site_title: &str, authors: &[Author], flash: Option<&Flash>) -> String {
    let mut body = String::from(
        r#"<form method="post" action="/add_author">
        <label>Name <input type="text" name="name" required></label>
        <label>Birth date <input type="date" name="birth_date"></label>
        <label>Date of death <input type="date" name="date_of_death"></label>
        <button type="submit">Add author</button>
    </form>
    <h2>Authors</h2>
    <ul>"#,
    );

    for author in authors {
        let _ = write!(
            body,
            r#"<li><a href="/author/{}">{}</a></li>"#,
            author.id,
            escape(author.name.as_str())
        );
    }
    body.push_str("</ul>");

    layout(site_title, "Add author", flash, &body)
}

/// Book form with author choices.
pub fn add_book(site_title: &str, authors: &[Author], flash: Option<&Flash>) -> String {
    let mut options = String::new();
    for author in authors {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            author.id,
            escape(author.name.as_str())
        );
    }

    let body = format!(
        r#"<form method="post" action="/add_book">
        <label>ISBN <input type="text" name="isbn" required></label>
        <label>Title <input type="text" name="title" required></label>
        <label>Publication year <input type="number" name="publication_year" required></label>
        <label>Author <select name="author_id" required>{options}</select></label>
        <button type="submit">Add book</button>
    </form>"#
    );

    layout(site_title, "Add book", flash, &body)
}

/// Book detail page.
pub fn book_details(
    site_title: &str,
    listing: &BookListing,
    cover: &CoverImage,
    cover_url: &str,
) -> String {
    let book = &listing.book;
    let cover_note = match cover {
        CoverImage::Cached { .. } => "",
        CoverImage::Placeholder => "<p><em>No cover available.</em></p>",
    };

    let body = format!(
        r#"<img src="{cover_url}" alt="Cover of {title}">
    {cover_note}
    <dl>
        <dt>Author</dt><dd><a href="/author/{author_id}">{author}</a></dd>
        <dt>ISBN</dt><dd>{isbn}</dd>
        <dt>Published</dt><dd>{year}</dd>
    </dl>
    <form method="post" action="/book/{id}/delete"><button type="submit">Delete book</button></form>"#,
        cover_url = escape(cover_url),
        title = escape(book.title.as_str()),
        cover_note = cover_note,
        author_id = book.author_id,
        author = escape(listing.author_name.as_str()),
        isbn = escape(book.isbn.as_str()),
        year = book.publication_year,
        id = book.id,
    );

    layout(site_title, &book.title, None, &body)
}

/// Author detail page.
pub fn author_details(site_title: &str, author: &Author, books: &[Book]) -> String {
    let mut body = format!(
        r#"<dl>
        <dt>Born</dt><dd>{born}</dd>
        <dt>Died</dt><dd>{died}</dd>
    </dl>
    <h2>Books</h2>
    <ul>"#,
        born = format_date(author.birth_date),
        died = format_date(author.date_of_death),
    );

    for book in books {
        let _ = write!(
            body,
            r#"<li><a href="/book/{}">{}</a> ({})</li>"#,
            book.id,
            escape(book.title.as_str()),
            book.publication_year
        );
    }

    let _ = write!(
        body,
        r#"</ul>
    <form method="post" action="/author/{}/delete"><button type="submit">Delete author and all their books</button></form>"#,
        author.id
    );

    layout(site_title, &author.name, None, &body)
}

/// Error page for failed requests.
pub fn error_page(site_title: &str, status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<p>{}</p><p><a href="/">Back to the library</a></p>"#,
        escape(message)
    );
    layout(site_title, &format!("{} {}", status.as_u16(), title), None, &body)
}

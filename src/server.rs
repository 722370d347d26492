//! HTTP server and routes.

mod handlers;
pub mod pages;
mod state;

pub use handlers::ApiBook;
pub use state::AppState;

use crate::covers::{COVERS_ROUTE, PLACEHOLDER_ROUTE};
use axum::{
    Router,
    middleware::map_response_with_state,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let book_routes = Router::new()
        .route("/{id}", get(handlers::book_details))
        .route("/{id}/delete", post(handlers::delete_book));

    let author_routes = Router::new()
        .route("/{id}", get(handlers::author_details))
        .route("/{id}/delete", post(handlers::delete_author));

    let api_routes = Router::new()
        .route("/books", get(handlers::api_books))
        .route("/stats", get(handlers::api_stats));

    let covers = ServeDir::new(state.covers.cache_dir());

    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/add_author",
            get(handlers::add_author_form).post(handlers::add_author),
        )
        .route(
            "/add_book",
            get(handlers::add_book_form).post(handlers::add_book),
        )
        .nest("/book", book_routes)
        .nest("/author", author_routes)
        .nest("/api", api_routes)
        .route(PLACEHOLDER_ROUTE, get(handlers::placeholder))
        .nest_service(COVERS_ROUTE, covers)
        .layer(map_response_with_state(
            state.clone(),
            handlers::titled_error_page,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::covers::tests::FakeSource;
    use crate::db::Database;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        state: AppState,
        source: Arc<FakeSource>,
        _tmp: tempfile::TempDir,
    }

    fn harness(source: FakeSource) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.covers.cache_dir = tmp.path().join("covers");
        config.covers.placeholder_url = "/static/placeholder.png".to_string();
        config.server.title = "Home Shelf".to_string();

        let source = Arc::new(source);
        let state = AppState::new(config, Database::open_memory().unwrap(), source.clone());
        Harness {
            router: create_router(state.clone()),
            state,
            source,
            _tmp: tmp,
        }
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    async fn post_form(router: &Router, uri: &str, form: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (response.status(), location)
    }

    #[tokio::test]
    async fn home_lists_books_with_cached_cover() {
        let h = harness(FakeSource::ok(b"img"));
        let author = h
            .state
            .catalog
            .add_author("Larry McMurtry", None, None)
            .unwrap();
        h.state
            .catalog
            .add_book("9780671683058", "Lonesome Dove", 1985, author.id)
            .unwrap();

        let (status, body) = get(&h.router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Lonesome Dove"));
        assert!(body.contains("/covers/lonesome_dove.jpg"));
        assert_eq!(h.source.calls(), 1);

        let (status, body) = get(&h.router, "/covers/lonesome_dove.jpg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "img");
    }

    #[tokio::test]
    async fn missing_cover_uses_placeholder() {
        let h = harness(FakeSource::not_found());
        let author = h.state.catalog.add_author("Anon", None, None).unwrap();
        let book = h
            .state
            .catalog
            .add_book("0000000000", "Lost Pages", 1900, author.id)
            .unwrap();

        let (status, body) = get(&h.router, &format!("/book/{}", book.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/static/placeholder.png"));
        assert!(body.contains("No cover available"));
    }

    #[tokio::test]
    async fn default_placeholder_is_served_locally() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.covers.cache_dir = tmp.path().join("covers");
        let state = AppState::new(
            config,
            Database::open_memory().unwrap(),
            Arc::new(FakeSource::not_found()),
        );
        let router = create_router(state.clone());

        let author = state.catalog.add_author("Anon", None, None).unwrap();
        state
            .catalog
            .add_book("0000000000", "Lost Pages", 1900, author.id)
            .unwrap();

        let (_, body) = get(&router, "/api/books").await;
        let books: Vec<ApiBook> = serde_json::from_str(&body).unwrap();
        assert_eq!(books[0].cover_image_url, PLACEHOLDER_ROUTE);

        let response = router
            .clone()
            .oneshot(Request::get(PLACEHOLDER_ROUTE).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).starts_with("<svg"));
    }

    #[tokio::test]
    async fn add_author_redirects_with_message() {
        let h = harness(FakeSource::not_found());

        let (status, location) = post_form(
            &h.router,
            "/add_author",
            "name=John+Steinbeck&birth_date=1902-02-27&date_of_death=1968-12-20",
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(location.starts_with("/add_author?message="));
        assert!(location.ends_with("level=success"));

        let (_, location) = post_form(&h.router, "/add_author", "name=John+Steinbeck").await;
        assert!(location.ends_with("level=danger"));
        assert!(location.contains("already%20exists"));

        let authors = h.state.catalog.authors().unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(
            authors[0].birth_date,
            chrono::NaiveDate::from_ymd_opt(1902, 2, 27)
        );
    }

    #[tokio::test]
    async fn add_book_rejects_bad_year_and_duplicate_isbn() {
        let h = harness(FakeSource::not_found());
        let author = h.state.catalog.add_author("Jane Austen", None, None).unwrap();

        let form = format!(
            "isbn=9780141439518&title=Pride+and+Prejudice&publication_year=1813&author_id={}",
            author.id
        );
        let (_, location) = post_form(&h.router, "/add_book", &form).await;
        assert!(location.ends_with("level=success"));

        let (_, location) = post_form(&h.router, "/add_book", &form).await;
        assert!(location.ends_with("level=danger"));

        let bad = format!(
            "isbn=1&title=Emma&publication_year=eighteen&author_id={}",
            author.id
        );
        let (_, location) = post_form(&h.router, "/add_book", &bad).await;
        assert!(location.ends_with("level=danger"));

        assert_eq!(h.state.catalog.counts().unwrap().books, 1);
    }

    #[tokio::test]
    async fn delete_routes_cascade_and_404() {
        let h = harness(FakeSource::not_found());
        let author = h
            .state
            .catalog
            .add_author("Larry McMurtry", None, None)
            .unwrap();
        let book = h
            .state
            .catalog
            .add_book("9780671683058", "Lonesome Dove", 1985, author.id)
            .unwrap();

        let (status, location) =
            post_form(&h.router, &format!("/book/{}/delete", book.id), "").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(location.starts_with("/?message="));
        assert!(h.state.catalog.author(author.id).is_err());

        let (status, body) = get(&h.router, &format!("/author/{}", author.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("404"));
        assert!(body.contains("Home Shelf"));
        assert!(!body.contains("- Library<"));

        let (status, _) = post_form(&h.router, "/author/999/delete", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_books_filters_and_sorts() {
        let h = harness(FakeSource::not_found());
        let steinbeck = h
            .state
            .catalog
            .add_author("John Steinbeck", None, None)
            .unwrap();
        let austen = h.state.catalog.add_author("Jane Austen", None, None).unwrap();
        h.state
            .catalog
            .add_book("1", "The Grapes of Wrath", 1939, steinbeck.id)
            .unwrap();
        h.state
            .catalog
            .add_book("2", "East of Eden", 1952, steinbeck.id)
            .unwrap();
        h.state
            .catalog
            .add_book("3", "Emma", 1815, austen.id)
            .unwrap();

        let (status, body) = get(&h.router, "/api/books?sort_by=author&search=steinBECK").await;
        assert_eq!(status, StatusCode::OK);
        let books: Vec<ApiBook> = serde_json::from_str(&body).unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["East of Eden", "The Grapes of Wrath"]);
        assert!(books.iter().all(|b| b.cover_image_url == "/static/placeholder.png"));

        let (_, body) = get(&h.router, "/api/books?sort_by=bogus").await;
        let books: Vec<ApiBook> = serde_json::from_str(&body).unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["East of Eden", "Emma", "The Grapes of Wrath"]);
    }
}

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced author or book does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate author name or book ISBN.
    #[error("{0}")]
    Conflict(String),

    /// Malformed or missing input value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let message = self.to_string();
        let page = crate::server::pages::error_page(DEFAULT_SITE_TITLE, status, &message);
        let mut response = (status, Html(page)).into_response();
        response.extensions_mut().insert(ErrorMessage(message));
        response
    }
}

/// Site title used when an error page is rendered outside the router.
const DEFAULT_SITE_TITLE: &str = "Library";

/// Message of an error response, kept so the router can re-render the page
/// with the configured site title.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vthumb_core::error::ThumbError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`ThumbError`] for pipeline failures and adds HTTP-specific
/// variants. Errors are served as `text/plain` with the message verbatim so
/// clients see exactly why the thumbnail could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A pipeline error from `vthumb_core`.
    #[error(transparent)]
    Thumb(#[from] ThumbError),

    /// The query string could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Thumb(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Thumb(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, "Thumbnail request failed");
        } else {
            tracing::debug!(error = %message, "Rejected thumbnail request");
        }

        (
            status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

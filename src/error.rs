use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::extract::ExtractionError;

/// All errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Upstream request to {url} failed: {reason}")]
    UpstreamFetch { url: String, reason: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    pub fn upstream(url: &str, reason: impl ToString) -> Self {
        AppError::UpstreamFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UpstreamFetch { .. } | AppError::Extraction(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::PasswordHash(_)
            | AppError::Json(_)
            | AppError::Custom(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to show to the client verbatim.
    fn is_public(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Configuration(_) | AppError::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Client-facing error: an HTTP status plus a `{ "error": ... }` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!("{err}");
        }
        let message = if err.is_public() {
            err.to_string()
        } else {
            "Internal server error".to_string()
        };
        ApiError { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {rejection}");
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!("Rejected form body: {rejection}");
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Attach a generic client-facing message to a failed operation.
///
/// Validation, configuration and not-found errors keep their own message;
/// everything else is logged and replaced by `message`.
pub trait OrRespond<T> {
    fn or_respond(self, message: &str) -> std::result::Result<T, ApiError>;
}

impl<T> OrRespond<T> for Result<T> {
    fn or_respond(self, message: &str) -> std::result::Result<T, ApiError> {
        self.map_err(|err| {
            let status = err.status();
            if err.is_public() {
                return ApiError::new(status, err.to_string());
            }
            tracing::error!("{message}: {err}");
            ApiError::new(status, message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::upstream("http://x", "boom").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Extraction(ExtractionError::MissingScript).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Validation("q".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Configuration("key".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_or_respond_hides_upstream_details() {
        let failed: Result<()> = Err(AppError::upstream("http://secret", "Bad status code: 503"));
        let err = failed.or_respond("Failed to fetch GLB file").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "Failed to fetch GLB file");

        let invalid: Result<()> = Err(AppError::Validation("Search term is required".into()));
        let err = invalid.or_respond("ignored").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Search term is required");
    }
}

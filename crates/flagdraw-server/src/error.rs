//! API errors and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flagdraw_core::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,
    /// Malformed or invalid request body. The detail is logged, not returned.
    #[error("Invalid flag data: {0}")]
    Validation(String),
    /// Missing, or owned by someone else.
    #[error("Flag not found")]
    NotFound,
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: StorageError,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Validation(_) => "Invalid flag data".to_string(),
            Self::Storage { context, .. } => context.to_string(),
            other => other.to_string(),
        }
    }
}

/// Attach a client-facing message to storage failures.
pub trait StorageContext<T> {
    fn context(self, context: &'static str) -> ApiResult<T>;
}

impl<T> StorageContext<T> for Result<T, StorageError> {
    fn context(self, context: &'static str) -> ApiResult<T> {
        self.map_err(|source| ApiError::Storage { context, source })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage { .. } => tracing::error!("{}", self),
            Self::Validation(detail) => tracing::debug!("Rejected request: {}", detail),
            _ => {}
        }
        let body = ErrorBody {
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_details_stay_private() {
        let err: ApiResult<()> =
            Err(StorageError::Io("disk on fire".into())).context("Failed to fetch flags");
        let err = err.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to fetch flags");
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_validation_message_is_generic() {
        let err = ApiError::Validation("name: empty".into());
        assert_eq!(err.public_message(), "Invalid flag data");
    }
}

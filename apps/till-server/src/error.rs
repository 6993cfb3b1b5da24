//! Error types for the REST API.
//!
//! Every failure leaves the server as `{ "code", "message" }` with the
//! matching status.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use till_core::CoreError;
use till_db::EngineError;

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InvalidAddOn,
    InsufficientStock,
    Forbidden,
    Unauthorized,
    DatabaseError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::InvalidAddOn => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error returned by every handler.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InvalidInput(_) => ErrorCode::ValidationError,
            CoreError::InvalidAddOn { .. } => ErrorCode::InvalidAddOn,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Forbidden(_) => ErrorCode::Forbidden,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(err) => err.into(),
            EngineError::PersistenceFailure(err) => {
                // Raw database details stay in the logs
                error!(error = %err, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "The sale could not be saved; nothing was changed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use till_db::DbError;

    #[test]
    fn test_core_errors_map_to_codes() {
        let cases = [
            (CoreError::not_found("Product", 3), ErrorCode::NotFound, StatusCode::NOT_FOUND),
            (
                CoreError::invalid_add_on("Burger", "category not allowed"),
                ErrorCode::InvalidAddOn,
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::InsufficientStock {
                    product: "Burger".to_string(),
                    available: 1,
                    requested: 2,
                },
                ErrorCode::InsufficientStock,
                StatusCode::CONFLICT,
            ),
            (CoreError::Forbidden("no".to_string()), ErrorCode::Forbidden, StatusCode::FORBIDDEN),
        ];

        for (err, code, status) in cases {
            let message = err.to_string();
            let api: ApiError = err.into();
            assert_eq!(api.code, code);
            assert_eq!(api.code.status(), status);
            assert_eq!(api.message, message);
        }
    }

    #[test]
    fn test_persistence_failure_hides_details() {
        let err = EngineError::PersistenceFailure(DbError::QueryFailed("disk I/O error at page 7".to_string()));
        let api: ApiError = err.into();

        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert!(!api.message.contains("page 7"));
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(ApiError::unauthorized("missing token")).unwrap();
        assert_eq!(body, serde_json::json!({ "code": "UNAUTHORIZED", "message": "missing token" }));
    }
}

//! HTTP error type.
//!
//! Every failure leaves the server as `{"error": "<message>"}`. Storage
//! failures carry a fixed public message; the detail only goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relstore_core::{ServiceError, ValidationError};
use serde_json::json;

/// Message for a missing release.
pub const NOT_FOUND_MESSAGE: &str = "Release not found";

/// API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{public}: {detail}")]
    Internal { public: &'static str, detail: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound {
            message: NOT_FOUND_MESSAGE.to_string(),
        }
    }

    /// Map a service error, using `public` as the message for 500s.
    pub fn from_service(err: ServiceError, public: &'static str) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Storage(e) => Self::Internal {
                public,
                detail: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Attach the public 500 message to a service call.
pub trait ServiceResultExt<T> {
    fn or_api(self, public: &'static str) -> Result<T, ApiError>;
}

impl<T> ServiceResultExt<T> for Result<T, ServiceError> {
    fn or_api(self, public: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_service(e, public))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest { message } | Self::NotFound { message } => message,
            Self::Internal { public, detail } => {
                tracing::error!(error = %detail, "{public}");
                public.to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relstore_core::StorageError;

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let err = ApiError::from_service(
            ServiceError::Storage(StorageError::connection("db at 10.0.0.5 refused")),
            "Failed to fetch releases",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = ValidationError::EmptyIds.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "ids must be a non-empty array");
    }
}

//! API error types for handler operations
//!
//! Every failure a handler can report becomes an [`ApiError`], which renders as
//! a JSON body with an explicit status code:
//!
//! ```json
//! {"error": "Invalid input", "code": "VALIDATION_FAILED", "status": 400,
//!  "fields": {"name": ["This field is required."]}}
//! ```

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::filter::InvalidFilter;
use crate::models::FieldErrors;
use crate::pagination::InvalidPagination;
use crate::policy::AccessDenied;
use crate::repository::{RepositoryError, RepositoryErrorKind};

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Login with an unknown username or a wrong password
    AuthenticationFailed,
    /// No valid credentials on a protected endpoint
    Unauthenticated,
    /// Authenticated, but not allowed
    Forbidden,
    NotFound,
    /// Payload failed field constraints
    ValidationFailed,
    InvalidPagination,
    InvalidFilter,
    /// Malformed request (e.g. unparsable JSON)
    BadRequest,
    /// Operation conflicts with related records
    Conflict,
    Internal,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed => write!(f, "authentication_failed"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::InvalidPagination => write!(f, "invalid_pagination"),
            Self::InvalidFilter => write!(f, "invalid_filter"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationFailed
            | Self::ValidationFailed
            | Self::InvalidPagination
            | Self::InvalidFilter
            | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        self.to_string().to_uppercase()
    }
}

/// Structured API error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Per-field messages for validation failures
    pub fields: Option<FieldErrors>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            entity_type: None,
            entity_id: None,
        }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::AuthenticationFailed, message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            ApiErrorKind::Unauthenticated,
            "Authentication credentials were not provided.",
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            ApiErrorKind::Forbidden,
            "You do not have permission to perform this action.",
        )
    }

    /// Generic 404 for a route or id that does not resolve
    pub fn not_found() -> Self {
        Self::new(ApiErrorKind::NotFound, "Not found.")
    }

    pub fn validation_failed(fields: FieldErrors) -> Self {
        Self {
            fields: Some(fields),
            ..Self::new(ApiErrorKind::ValidationFailed, "Invalid input")
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }

    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {} error: {}", self.kind, self.message)?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            );
        } else {
            tracing::debug!(kind = %self.kind, status = status.as_u16(), "API error: {}", self.message);
        }

        let response = ApiErrorResponse {
            error: self.message,
            code: self.kind.error_code(),
            status: status.as_u16(),
            fields: self.fields,
        };

        (status, Json(response)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let (kind, fields) = match (err.kind, &err.field) {
            (RepositoryErrorKind::NotFound, _) => (ApiErrorKind::NotFound, None),
            // Field-level failures render like payload validation
            (
                RepositoryErrorKind::AlreadyExists | RepositoryErrorKind::ValidationFailed,
                Some(field),
            ) => (
                ApiErrorKind::ValidationFailed,
                Some(FieldErrors::single(field.clone(), err.message.clone())),
            ),
            (RepositoryErrorKind::AlreadyExists, None) | (RepositoryErrorKind::ConstraintViolation, _) => {
                (ApiErrorKind::Conflict, None)
            }
            (RepositoryErrorKind::ValidationFailed, None) => (ApiErrorKind::BadRequest, None),
            (RepositoryErrorKind::Unsupported | RepositoryErrorKind::Internal, _) => {
                tracing::error!(
                    operation = %err.operation,
                    kind = %err.kind,
                    "repository failure: {}", err.message
                );
                (ApiErrorKind::Internal, None)
            }
        };

        // Internal details stay in the log
        let message = match kind {
            ApiErrorKind::Internal => "An internal error occurred".to_string(),
            ApiErrorKind::NotFound => "Not found.".to_string(),
            ApiErrorKind::ValidationFailed => "Invalid input".to_string(),
            _ => err.message,
        };

        Self {
            kind,
            message,
            fields,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        Self::validation_failed(fields)
    }
}

impl From<InvalidFilter> for ApiError {
    fn from(err: InvalidFilter) -> Self {
        Self::new(ApiErrorKind::InvalidFilter, err.to_string())
    }
}

impl From<InvalidPagination> for ApiError {
    fn from(err: InvalidPagination) -> Self {
        Self::new(ApiErrorKind::InvalidPagination, err.to_string())
    }
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => Self::unauthenticated(),
            AccessDenied::Forbidden => Self::forbidden(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidUsername | AuthError::InvalidPassword => {
                Self::authentication_failed(err.to_string())
            }
            AuthError::Internal(err) => err.into(),
        }
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::internal("An internal error occurred")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiErrorKind::AuthenticationFailed.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiErrorKind::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiErrorKind::InvalidPagination.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiErrorKind::InvalidFilter.error_code(), "INVALID_FILTER");
        assert_eq!(ApiErrorKind::Internal.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_access_denied_conversion() {
        let err: ApiError = AccessDenied::Unauthenticated.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let err: ApiError = AccessDenied::Forbidden.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_repository_conversions() {
        let err: ApiError = RepositoryError::not_found("Product", 4).into();
        assert_eq!(err.kind, ApiErrorKind::NotFound);
        assert_eq!(err.entity_id.as_deref(), Some("4"));

        let err: ApiError =
            RepositoryError::already_exists(RepositoryOperation::Create, "Tag", "name").into();
        assert_eq!(err.kind, ApiErrorKind::ValidationFailed);
        let fields = err.fields.unwrap();
        assert_eq!(
            fields.get("name").unwrap(),
            ["tag with this name already exists.".to_string()]
        );

        let err: ApiError =
            RepositoryError::constraint_violation(RepositoryOperation::Delete, "still referenced")
                .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError =
            RepositoryError::constraint_violation(RepositoryOperation::Delete, "still referenced")
                .with_field("category_id")
                .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.fields.is_none());
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err: ApiError = RepositoryError::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::Internal,
            "Product references a missing category",
        )
        .into();
        assert_eq!(err.kind, ApiErrorKind::Internal);
        assert!(!err.message.contains("category"));
    }

    #[tokio::test]
    async fn test_response_body() {
        let (status, body) =
            body_json(ApiError::validation_failed(FieldErrors::single("price", "This field is required.")))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["status"], 400);
        assert_eq!(body["fields"]["price"][0], "This field is required.");

        let (_, body) = body_json(AuthError::InvalidUsername.into()).await;
        assert_eq!(body["error"], "Invalid username");
        assert!(body.get("fields").is_none());
    }
}

//! Request extractors with structured rejections

use axum::extract::{rejection::JsonRejection, FromRequestParts, Path};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;
use crate::models::{FieldErrors, Id};

/// Raw JSON request body. Handlers take it as their last argument and decode it
/// with [`parse_body`] once the caller is authorized.
pub type JsonBody = Result<Json<Value>, JsonRejection>;

/// Decode a JSON body into `T`.
///
/// Syntax errors and a body of the wrong shape are bad requests. A field with
/// the wrong type or format is reported against that field.
pub fn parse_body<T: DeserializeOwned>(body: JsonBody) -> Result<T, ApiError> {
    let Json(value) = body?;
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let message = err.inner().to_string();
        match path.split(['.', '[']).next().filter(|field| !field.is_empty()) {
            Some(field) => ApiError::validation_failed(FieldErrors::single(field, message)),
            None => ApiError::bad_request(message),
        }
    })
}

/// Record id from the `{id}` path segment.
///
/// A segment that is not an integer cannot name any record, so it is rejected
/// as not found rather than as a malformed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId(pub Id);

impl<S: Send + Sync> FromRequestParts<S> for EntityId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found())?;
        raw.parse::<Id>()
            .map(Self)
            .map_err(|_| ApiError::not_found())
    }
}

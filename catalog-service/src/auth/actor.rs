//! Caller identity
//!
//! [`Caller`] is an axum extractor that resolves the `Authorization` header to
//! an account. A missing, unknown or expired token yields an anonymous caller
//! rather than a rejection, so the access policy decides what anonymous
//! callers may do.

use axum::{extract::FromRequestParts, http::header, http::request::Parts, http::HeaderMap};

use crate::handlers::ApiError;
use crate::models::{Id, Role, User};
use crate::policy::{self, Operation, Principal, Resource};
use crate::repository::Repository;
use crate::state::AppState;

/// Authorization schemes accepted in front of a token
const SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// An authenticated account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Id,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            role: self.role,
        }
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// The caller of a request; `None` inside when anonymous
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller(pub Option<Actor>);

impl Caller {
    /// Apply the access policy, returning the authenticated actor when allowed.
    pub fn authorize(&self, resource: Resource, operation: Operation) -> Result<&Actor, ApiError> {
        let principal = self.0.as_ref().map(Actor::principal);
        if let Err(denied) = policy::authorize(principal.as_ref(), resource, operation) {
            tracing::warn!(
                %resource,
                %operation,
                actor = ?principal.map(|p| p.user_id),
                ?denied,
                "request denied"
            );
            return Err(denied.into());
        }
        self.0.as_ref().ok_or_else(ApiError::unauthenticated)
    }
}

/// Token from an `Authorization: Token <t>` or `Authorization: Bearer <t>` header
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(Self::default());
        };

        let Some(user_id) = state.tokens().resolve(token).await? else {
            tracing::debug!("unknown or expired token");
            return Ok(Self::default());
        };

        match state.store().users().find_by_id(&user_id).await? {
            Some(user) if user.is_active => Ok(Self(Some(Actor::from(user)))),
            _ => {
                // Tokens of a removed or deactivated account never resolve again
                let revoked = state.tokens().revoke_all_for_user(user_id).await?;
                tracing::info!(user_id, revoked, "tokens revoked for unavailable account");
                Ok(Self::default())
            }
        }
    }
}

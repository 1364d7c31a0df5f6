//! Authentication: password hashing, opaque tokens and caller resolution
//!
//! Accounts log in with a username and password and receive an opaque token;
//! later requests present it as `Authorization: Token <token>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_service::auth::authenticate;
//!
//! let login = authenticate(&state, "alice", "correct horse").await?;
//! println!("{}", login.token);
//! ```

pub mod actor;
pub mod password;
pub mod tokens;

pub use actor::{extract_token, Actor, Caller};
pub use password::PasswordHasher;
pub use tokens::{IssuedToken, MemoryTokenStore, TokenGenerator, TokenStore};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::models::{User, UserSummary};
use crate::repository::{FilterCondition, Predicate, Repository};
use crate::state::AppState;

/// Why a login attempt failed
#[derive(Debug, Error)]
pub enum AuthError {
    /// No active account with this username
    #[error("Invalid username")]
    InvalidUsername,

    #[error("Invalid password")]
    InvalidPassword,

    #[error(transparent)]
    Internal(#[from] Error),
}

/// Successful login: the account and a newly issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    pub user: UserSummary,
    pub token: String,
}

async fn find_active_user(state: &AppState, username: &str) -> Result<Option<User>, Error> {
    let filter: Predicate = FilterCondition::eq("username", username).into();
    let user = state
        .store()
        .users()
        .find_first(&filter)
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(user.filter(|user| user.is_active))
}

/// Check credentials and issue a token.
///
/// Every successful login issues a new token; earlier tokens stay valid until
/// they expire.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Login, AuthError> {
    let user = find_active_user(state, username)
        .await?
        .ok_or(AuthError::InvalidUsername)?;

    // Argon2 verification is CPU-bound
    let hasher = state.hasher().clone();
    let password = password.to_owned();
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("password verification task failed: {e}")))??;

    if !matches {
        tracing::info!(user_id = user.id, "login rejected: wrong password");
        return Err(AuthError::InvalidPassword);
    }

    let issued = state.tokens().issue(user.id).await?;
    tracing::info!(user_id = user.id, "login succeeded");

    Ok(Login {
        user: UserSummary::from(&user),
        token: issued.token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BootstrapUser, Config};
    use crate::models::Role;

    async fn state_with_user() -> AppState {
        let mut config = Config::default();
        config.auth.memory_cost_kib = 1024;
        config.auth.time_cost = 1;
        config.auth.parallelism = 1;
        config.bootstrap.users = vec![BootstrapUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "wonderland".into(),
            role: Role::Plain,
        }];
        let state = AppState::builder().config(config).build().unwrap();
        state.bootstrap().await.unwrap();
        state
    }

    #[tokio::test]
    async fn test_authenticate_issues_resolvable_token() {
        let state = state_with_user().await;
        let login = authenticate(&state, "alice", "wonderland").await.unwrap();
        assert_eq!(login.user.username, "alice");
        assert!(login.token.starts_with("cat_"));
        assert_eq!(state.tokens().resolve(&login.token).await.unwrap(), Some(login.user.id));

        let again = authenticate(&state, "alice", "wonderland").await.unwrap();
        assert_ne!(again.token, login.token);
        assert!(state.tokens().resolve(&login.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_username() {
        let state = state_with_user().await;
        let err = authenticate(&state, "mallory", "wonderland").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidUsername));
        assert_eq!(err.to_string(), "Invalid username");
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let state = state_with_user().await;
        let err = authenticate(&state, "alice", "looking-glass").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));
    }
}

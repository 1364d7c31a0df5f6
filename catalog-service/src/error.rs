//! Process-level errors: configuration, I/O, credential hashing and startup.
//!
//! Request-scoped failures are expressed as [`crate::handlers::ApiError`]; this type
//! converts into one when it crosses a handler boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential hashing or verification failed for a reason other than a mismatch
    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Seeding the store at startup failed
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

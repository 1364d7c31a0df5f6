//! # catalog-service
//!
//! HTTP API for managing a product catalog: categories, tags, products, product
//! images and user profiles, with token authentication, a role-based access
//! policy, filtered and paginated listings, and summary statistics.
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config);
//!
//!     let state = AppState::builder().config(config.clone()).build()?;
//!     state.bootstrap().await?;
//!
//!     Server::new(config).serve(router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod policy;
pub mod repository;
pub mod routes;
pub mod server;
pub mod state;
pub mod stats;

/// Commonly used types
pub mod prelude {
    pub use crate::auth::{authenticate, Actor, Caller, TokenStore};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiErrorKind};
    pub use crate::observability::init_tracing;
    pub use crate::routes::router;
    pub use crate::server::Server;
    pub use crate::state::AppState;
}

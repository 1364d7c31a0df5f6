//! HTTP handlers for the catalog API
//!
//! - [`collection`]: generic list/retrieve/create/update/delete over a collection
//! - [`login`], [`profiles`], [`stats`], [`health`]: the remaining endpoints
//! - [`ApiError`]: every failure, rendered as a structured JSON body

pub mod categories;
pub mod collection;
pub mod error;
pub mod extract;
pub mod health;
pub mod login;
pub mod product_images;
pub mod products;
pub mod profiles;
pub mod response;
pub mod stats;
pub mod tags;

#[cfg(test)]
pub(crate) mod test_support;

pub use collection::{collection_routes, CollectionEndpoint};
pub use error::{ApiError, ApiErrorKind, ApiErrorResponse};
pub use extract::EntityId;
pub use response::{Created, NoContent};

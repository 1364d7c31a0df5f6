//! Repository abstraction for catalog collections
//!
//! - [`Repository`]: per-collection CRUD, counting and windowed reads
//! - [`Aggregator`]: counts, sums and averages over whole collections
//! - [`Predicate`] / [`FilterCondition`]: storage-neutral record filters
//! - [`MemoryStore`]: in-process implementation over a single `RwLock`

mod error;
mod memory;
mod query;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use memory::{
    Categories, CategoryRepository, MemoryRepository, MemoryStore, ProductImageRepository,
    ProductImages, ProductRepository, Products, ProfileRepository, Profiles, Resource, Table,
    Tables, TagRepository, Tags, UserRepository, Users,
};
pub use query::{
    fold_aggregates, AggregateQuery, AggregateSpec, AggregateValue, Collection, FieldValue,
    FilterCondition, FilterOperator, FilterValue, Predicate, Record, Window,
};
pub use traits::{Aggregator, Repository, RepositoryResult};

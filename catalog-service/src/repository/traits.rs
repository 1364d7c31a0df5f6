//! Repository traits
//!
//! Storage-agnostic CRUD and query access for one record type, plus a
//! cross-collection aggregation capability. Methods return `impl Future + Send`
//! so implementations can be used from multi-threaded handlers.

use std::future::Future;

use super::error::RepositoryError;
use super::query::{AggregateQuery, AggregateValue, Predicate, Window};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Generic repository over one collection.
///
/// # Type Parameters
///
/// - `Id`: identifier type
/// - `Entity`: the read form returned to callers (relations resolved)
/// - `Create`: creation payload
/// - `Update`: partial update payload
///
/// Collection order is stable across calls. `count` and `slice` issued
/// separately may observe different states if writes interleave; use
/// [`find_page`](Repository::find_page) when both must agree.
pub trait Repository<Id, Entity, Create, Update>: Send + Sync {
    fn find_by_id(&self, id: &Id) -> impl Future<Output = RepositoryResult<Option<Entity>>> + Send;

    /// First record (in collection order) matching the predicate
    fn find_first(
        &self,
        filter: &Predicate,
    ) -> impl Future<Output = RepositoryResult<Option<Entity>>> + Send;

    fn count(&self, filter: &Predicate) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Matching records in `[start, end)`, clamped to the number of matches
    fn slice(
        &self,
        filter: &Predicate,
        start: u64,
        end: u64,
    ) -> impl Future<Output = RepositoryResult<Vec<Entity>>> + Send;

    /// Total number of matches and the records inside `window`, read from one snapshot
    fn find_page(
        &self,
        filter: &Predicate,
        window: Window,
    ) -> impl Future<Output = RepositoryResult<(u64, Vec<Entity>)>> + Send;

    fn exists(&self, id: &Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    fn create(&self, data: Create) -> impl Future<Output = RepositoryResult<Entity>> + Send;

    /// Apply a partial update; fails with `NotFound` when the id is unknown
    fn update(&self, id: &Id, data: Update) -> impl Future<Output = RepositoryResult<Entity>> + Send;

    /// Returns `false` when nothing was deleted
    fn delete(&self, id: &Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Like [`update`](Repository::update), but only when the record also matches
    /// `filter` at the time of the write. `None` when it does not exist or does not match.
    fn update_matching(
        &self,
        id: &Id,
        filter: &Predicate,
        data: Update,
    ) -> impl Future<Output = RepositoryResult<Option<Entity>>> + Send;

    /// Like [`delete`](Repository::delete), restricted to records matching `filter`
    fn delete_matching(
        &self,
        id: &Id,
        filter: &Predicate,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;
}

/// Aggregates over whole collections.
///
/// All queries of one call are answered from a single read-consistent snapshot,
/// even when they span several collections.
pub trait Aggregator: Send + Sync {
    fn aggregate(
        &self,
        queries: &[AggregateQuery],
    ) -> impl Future<Output = RepositoryResult<Vec<AggregateValue>>> + Send;
}

use crate::{
    entity::{Entity, Projection},
    error::DataError,
    filter::Filter,
    query::Query,
    record::Record,
};
use futures::stream::BoxStream;
use std::future::Future;

/// Generic data-access contract shared by every storage engine.
///
/// A value of this trait is a *session*: it owns at most one open
/// transaction and the set of records read with `tracked = true`. Outside an
/// explicit transaction each call is committed on its own.
pub trait Repository<T: Entity>: Send {
    /// Inserts `entity` and returns it carrying the storage-assigned key.
    fn create(&mut self, entity: T) -> impl Future<Output = Result<T, DataError>> + Send;

    /// First row matching `filter` (any row when `None`).
    fn get_one(
        &mut self,
        filter: Option<Filter>,
        tracked: bool,
    ) -> impl Future<Output = Result<Option<Record<T>>, DataError>> + Send;

    fn get_all(
        &mut self,
        filter: Option<Filter>,
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;

    /// Deletes the row keyed by `entity`; `DataError::NotFound` when it is gone.
    fn remove(&mut self, entity: &T) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Writes pending edits of tracked records and returns the rows written.
    fn save(&mut self) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Opens a transaction; a no-op when one is already open.
    fn begin_transaction(&mut self) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Saves tracked edits and commits.
    ///
    /// If the save fails the transaction stays open so the caller can roll
    /// it back.
    fn commit(&mut self) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Discards the transaction and every tracked edit.
    fn rollback(&mut self) -> impl Future<Output = Result<(), DataError>> + Send;

    fn get_projected<P: Projection<T>>(
        &mut self,
        filter: Filter,
    ) -> impl Future<Output = Result<Option<P>, DataError>> + Send;

    fn get_all_projected<P: Projection<T>>(
        &mut self,
        filter: Option<Filter>,
    ) -> impl Future<Output = Result<Vec<P>, DataError>> + Send;

    fn query(&self, tracked: bool) -> Query<T> {
        Query::new(tracked)
    }

    fn fetch(
        &mut self,
        query: Query<T>,
    ) -> impl Future<Output = Result<Vec<Record<T>>, DataError>> + Send;

    /// Lazy, untracked scan. The stream borrows the session until dropped.
    fn stream(&mut self, filter: Option<Filter>) -> BoxStream<'_, Result<T, DataError>>;

    fn exists(&mut self, filter: Filter) -> impl Future<Output = Result<bool, DataError>> + Send;

    fn in_transaction(&self) -> bool;
}

/// Source of per-request sessions.
pub trait Storage<T: Entity>: Clone + Send + Sync + 'static {
    type Session: Repository<T> + 'static;

    fn session(&self) -> Self::Session;
}

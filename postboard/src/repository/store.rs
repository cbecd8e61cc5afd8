//! Storage capability the generic repository delegates to

use std::future::Future;

use super::entity::Entity;
use super::pagination::{PageRequest, Pagination, Paginator};
use super::query::Query;
use super::traits::RepositoryResult;

/// Raw storage operations for one entity type
///
/// A store does no classification beyond turning driver errors into
/// [`RepositoryError`](super::RepositoryError)s: "zero rows" is reported as
/// `None` or a row count of 0 and the repository decides what that means.
pub trait Store<T: Entity>: Send + Sync {
    /// Insert a prepared entity together with any nested rows it owns
    fn create(&self, entity: T) -> impl Future<Output = RepositoryResult<T>> + Send;

    /// First row matching `query`, with the requested associations loaded
    fn find_first(&self, query: &Query) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Every row matching `query`, optionally bounded to a window
    fn find_all(
        &self,
        query: &Query,
        window: Option<Pagination>,
    ) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    fn count(&self, query: &Query) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Write the entity's full row by id; returns rows affected
    fn save(&self, entity: &T) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Remove the row with `id`; returns rows affected
    fn delete(&self, id: &str) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Count and window fetch for one page.
    ///
    /// Stores that can run both reads in one snapshot should override this.
    fn find_page(
        &self,
        query: &Query,
        page: PageRequest,
    ) -> impl Future<Output = RepositoryResult<(Vec<T>, Paginator)>> + Send {
        async move {
            let total = self.count(query).await?;
            let items = self.find_all(query, Some(page.window())).await?;
            Ok((items, page.paginator(total)))
        }
    }
}

//! Repository trait definitions
//!
//! [`Repository`] is the contract the service layer programs against. It uses
//! RPITIT (return position `impl Trait` in traits) so implementations can be
//! plain `async fn`s, and it is generic over the entity type so one
//! implementation serves accounts and posts alike.
//!
//! # Example
//!
//! ```rust,ignore
//! use postboard::repository::{Query, Repository};
//!
//! async fn owner_of(
//!     ctx: &RequestContext,
//!     repo: &impl Repository<Account>,
//!     email: &str,
//! ) -> RepositoryResult<Account> {
//!     repo.find_one(ctx, Query::new().filter("email = ?", [email]), &["address"]).await
//! }
//! ```

use std::future::Future;

use super::entity::Entity;
use super::error::RepositoryError;
use super::pagination::Paginator;
use super::query::Query;
use crate::context::RequestContext;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Generic data access for one entity type
///
/// Every operation takes the caller's [`RequestContext`] first; a cancelled
/// context or an expired deadline fails the call with a `Cancelled` error.
pub trait Repository<T: Entity>: Send + Sync {
    /// Persist a new entity
    ///
    /// Runs the entity's pre-save hook (id, timestamps, version) first.
    /// Uniqueness violations fail with `Conflict`.
    fn create(&self, ctx: &RequestContext, entity: T)
        -> impl Future<Output = RepositoryResult<T>> + Send;

    /// First entity matching `filter`, with `preloads` loaded
    ///
    /// Fails with `NotFound` when nothing matches.
    fn find_one(
        &self,
        ctx: &RequestContext,
        filter: Query,
        preloads: &[&str],
    ) -> impl Future<Output = RepositoryResult<T>> + Send;

    /// Every entity matching `filter`; an empty result is not an error
    fn find_many(
        &self,
        ctx: &RequestContext,
        filter: Query,
        preloads: &[&str],
    ) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// One page of the entities matching `filter`
    ///
    /// `page` and `per_page` below 1 are clamped to 1. The count and the
    /// window fetch see the same filter and the same snapshot.
    fn find_many_paginated(
        &self,
        ctx: &RequestContext,
        filter: Query,
        page: i64,
        per_page: i64,
        preloads: &[&str],
    ) -> impl Future<Output = RepositoryResult<(Vec<T>, Paginator)>> + Send;

    /// Write back an existing entity
    ///
    /// Fails with `NotFound` if the id does not exist and with `Conflict` if
    /// the stored version is not older than the entity's.
    fn update(&self, ctx: &RequestContext, entity: T)
        -> impl Future<Output = RepositoryResult<T>> + Send;

    /// Remove an entity; dependents go with it through the schema's cascades
    fn delete(&self, ctx: &RequestContext, entity: &T)
        -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Number of entities matching `filter`
    fn count(&self, ctx: &RequestContext, filter: Query)
        -> impl Future<Output = RepositoryResult<u64>> + Send;
}

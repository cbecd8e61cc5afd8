//! The one [`Repository`] implementation every entity shares
//!
//! [`EntityRepository`] owns the behavior that must not vary per entity: it
//! runs the pre-save hook, races each store call against the caller's
//! context, turns "zero rows" into `NotFound` or `Conflict`, and logs the
//! outcome. The store underneath only moves rows.

use std::marker::PhantomData;

use super::entity::Entity;
use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::pagination::{PageRequest, Paginator};
use super::query::Query;
use super::store::Store;
use super::traits::{Repository, RepositoryResult};
use crate::context::RequestContext;

/// Generic repository over a [`Store`]
pub struct EntityRepository<T, S> {
    store: S,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S: Clone> Clone for EntityRepository<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T, S: std::fmt::Debug> std::fmt::Debug for EntityRepository<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRepository")
            .field("entity", &std::any::type_name::<T>())
            .field("store", &self.store)
            .finish()
    }
}

impl<T: Entity, S: Store<T>> EntityRepository<T, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn observe<R>(entity: &'static str, operation: RepositoryOperation, result: &RepositoryResult<R>) {
    match result {
        Ok(_) => tracing::debug!(entity, operation = %operation, "repository operation succeeded"),
        Err(e) if e.kind == RepositoryErrorKind::NotFound => {
            tracing::debug!(entity, operation = %operation, "no matching {}", entity)
        }
        Err(e) => tracing::warn!(
            entity,
            operation = %operation,
            kind = %e.kind,
            retriable = e.is_retriable(),
            error = %e,
            "repository operation failed"
        ),
    }
}

impl<T: Entity, S: Store<T>> Repository<T> for EntityRepository<T, S> {
    async fn create(&self, ctx: &RequestContext, mut entity: T) -> RepositoryResult<T> {
        let op = RepositoryOperation::Create;
        let result = async {
            entity
                .before_save(op)
                .map_err(|e| e.with_operation(op))?;
            ctx.run(op, self.store.create(entity))
                .await
                .map_err(|e| e.with_operation(op))
        }
        .await;
        observe(T::NAME, op, &result);
        result
    }

    async fn find_one(
        &self,
        ctx: &RequestContext,
        filter: Query,
        preloads: &[&str],
    ) -> RepositoryResult<T> {
        let op = RepositoryOperation::FindOne;
        let query = filter.with_preloads(preloads);
        let result = match ctx.run(op, self.store.find_first(&query)).await {
            Ok(Some(entity)) => Ok(entity),
            Ok(None) => Err(RepositoryError::no_match(op, T::NAME)),
            Err(e) => Err(e.with_operation(op)),
        };
        observe(T::NAME, op, &result);
        result
    }

    async fn find_many(
        &self,
        ctx: &RequestContext,
        filter: Query,
        preloads: &[&str],
    ) -> RepositoryResult<Vec<T>> {
        let op = RepositoryOperation::FindMany;
        let query = filter.with_preloads(preloads);
        let result = ctx
            .run(op, self.store.find_all(&query, None))
            .await
            .map_err(|e| e.with_operation(op));
        observe(T::NAME, op, &result);
        result
    }

    async fn find_many_paginated(
        &self,
        ctx: &RequestContext,
        filter: Query,
        page: i64,
        per_page: i64,
        preloads: &[&str],
    ) -> RepositoryResult<(Vec<T>, Paginator)> {
        let op = RepositoryOperation::FindManyPaginated;
        let query = filter.with_preloads(preloads);
        let request = PageRequest::clamped(page, per_page);
        let result = ctx
            .run(op, self.store.find_page(&query, request))
            .await
            .map_err(|e| e.with_operation(op));
        observe(T::NAME, op, &result);
        result
    }

    async fn update(&self, ctx: &RequestContext, mut entity: T) -> RepositoryResult<T> {
        let op = RepositoryOperation::Update;
        let result = async {
            if entity.id().is_empty() {
                return Err(RepositoryError::no_match(op, T::NAME));
            }
            entity
                .before_save(op)
                .map_err(|e| e.with_operation(op))?;

            let affected = ctx
                .run(op, self.store.save(&entity))
                .await
                .map_err(|e| e.with_operation(op))?;
            if affected > 0 {
                return Ok(entity);
            }

            // Nothing written: either the row is gone or a newer version is stored.
            let existing = ctx
                .run(op, self.store.count(&Query::by_id(entity.id())))
                .await
                .map_err(|e| e.with_operation(op))?;
            if existing == 0 {
                Err(RepositoryError::not_found(op, T::NAME, entity.id()))
            } else {
                Err(RepositoryError::conflict(
                    op,
                    format!("stored version is not older than {}", entity.version()),
                )
                .with_entity(T::NAME, entity.id()))
            }
        }
        .await;
        observe(T::NAME, op, &result);
        result
    }

    async fn delete(&self, ctx: &RequestContext, entity: &T) -> RepositoryResult<()> {
        let op = RepositoryOperation::Delete;
        let result = match ctx.run(op, self.store.delete(entity.id())).await {
            Ok(0) => Err(RepositoryError::not_found(op, T::NAME, entity.id())),
            Ok(_) => Ok(()),
            Err(e) => Err(e.with_operation(op).with_entity(T::NAME, entity.id())),
        };
        observe(T::NAME, op, &result);
        result
    }

    async fn count(&self, ctx: &RequestContext, filter: Query) -> RepositoryResult<u64> {
        let op = RepositoryOperation::Count;
        let result = ctx
            .run(op, self.store.count(&filter))
            .await
            .map_err(|e| e.with_operation(op));
        observe(T::NAME, op, &result);
        result
    }
}

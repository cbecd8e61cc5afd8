//! SQLite-backed [`Store`]
//!
//! Entities describe their table with [`SqlEntity`]; [`SqliteStore`] turns a
//! [`Query`] into one parameterized statement with `sqlx::QueryBuilder`.
//! Every `?` in a predicate is replaced by a bound parameter, list parameters
//! expand to `?, ?, ...`, and ordering fields are restricted to identifier
//! characters since they cannot be bound.

use std::future::Future;

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::entity::{Entity, Metadata};
use super::error::{RepositoryError, RepositoryOperation};
use super::generic::EntityRepository;
use super::pagination::{PageRequest, Pagination, Paginator};
use super::query::{FilterValue, Query};
use super::store::Store;
use super::traits::RepositoryResult;

/// Columns every entity table carries, in bind order
pub const METADATA_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "deleted_at", "version"];

/// Repository over SQLite for any [`SqlEntity`]
pub type SqliteRepository<T> = EntityRepository<T, SqliteStore>;

/// Table mapping for an entity stored in SQLite
pub trait SqlEntity: Entity + for<'r> FromRow<'r, SqliteRow> + Unpin {
    const TABLE: &'static str;

    /// Columns besides [`METADATA_COLUMNS`], in the order [`values`](Self::values) returns them
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<FilterValue>;

    /// Insert nested rows this entity owns, inside the creating transaction
    fn insert_related(
        &self,
        conn: &mut SqliteConnection,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        let _ = conn;
        async { Ok(()) }
    }

    /// Load the associations `query` asks for onto `rows`
    fn load_related(
        rows: &mut [Self],
        conn: &mut SqliteConnection,
        query: &Query,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        let _ = (rows, conn, query);
        async { Ok(()) }
    }
}

/// Pooled SQLite store shared by every repository
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository for `T` sharing this store's pool
    pub fn repository<T: SqlEntity>(&self) -> SqliteRepository<T> {
        EntityRepository::new(self.clone())
    }
}

fn metadata_values(meta: &Metadata) -> Vec<FilterValue> {
    vec![
        FilterValue::String(meta.id.clone()),
        meta.created_at.into(),
        meta.updated_at.into(),
        meta.deleted_at.into(),
        FilterValue::Integer(meta.version),
    ]
}

fn select_list<T: SqlEntity>() -> String {
    METADATA_COLUMNS
        .iter()
        .chain(T::COLUMNS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: FilterValue) {
    match value {
        FilterValue::String(s) => {
            builder.push_bind(s);
        }
        FilterValue::Integer(n) => {
            builder.push_bind(n);
        }
        FilterValue::Float(f) => {
            builder.push_bind(f);
        }
        FilterValue::Boolean(b) => {
            builder.push_bind(b);
        }
        FilterValue::Timestamp(t) => {
            builder.push_bind(t);
        }
        FilterValue::Null => {
            builder.push_bind(None::<String>);
        }
        // An empty list binds a single NULL, which matches nothing.
        FilterValue::StringList(list) if list.is_empty() => {
            builder.push_bind(None::<String>);
        }
        FilterValue::IntegerList(list) if list.is_empty() => {
            builder.push_bind(None::<i64>);
        }
        FilterValue::StringList(list) => {
            let mut separated = builder.separated(", ");
            for item in list {
                separated.push_bind(item);
            }
        }
        FilterValue::IntegerList(list) => {
            let mut separated = builder.separated(", ");
            for item in list {
                separated.push_bind(item);
            }
        }
    }
}

fn push_values(builder: &mut QueryBuilder<'_, Sqlite>, values: Vec<FilterValue>) {
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(builder, value);
    }
}

fn push_where(
    builder: &mut QueryBuilder<'_, Sqlite>,
    query: &Query,
    operation: RepositoryOperation,
) -> RepositoryResult<()> {
    for (i, predicate) in query.predicates().iter().enumerate() {
        if let Some(field) = predicate.field.as_deref().filter(|f| !is_identifier(f)) {
            return Err(RepositoryError::invalid_query(
                operation,
                format!("cannot filter on `{}`", field),
            ));
        }

        let segments = predicate.segments();
        let placeholders = segments.len() - 1;
        if placeholders != predicate.params.len() {
            return Err(RepositoryError::invalid_query(
                operation,
                format!(
                    "clause `{}` has {} placeholder(s) but {} parameter(s)",
                    predicate.clause,
                    placeholders,
                    predicate.params.len()
                ),
            ));
        }

        builder.push(if i == 0 { " WHERE (" } else { " AND (" });
        let mut params = predicate.params.iter().cloned();
        let mut pieces = segments.into_iter();
        if let Some(first) = pieces.next() {
            builder.push(first);
        }
        for piece in pieces {
            if let Some(value) = params.next() {
                push_value(builder, value);
            }
            builder.push(piece);
        }
        builder.push(")");
    }
    Ok(())
}

fn is_identifier(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn push_order(
    builder: &mut QueryBuilder<'_, Sqlite>,
    query: &Query,
    operation: RepositoryOperation,
) -> RepositoryResult<()> {
    for (i, (field, direction)) in query.ordering().iter().enumerate() {
        if !is_identifier(field) {
            return Err(RepositoryError::invalid_query(
                operation,
                format!("cannot order by `{}`", field),
            ));
        }
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder.push(field);
        builder.push(" ");
        builder.push(direction.as_sql());
    }
    Ok(())
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

async fn fetch_rows<T: SqlEntity>(
    conn: &mut SqliteConnection,
    query: &Query,
    window: Option<Pagination>,
    operation: RepositoryOperation,
) -> RepositoryResult<Vec<T>> {
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", select_list::<T>(), T::TABLE));
    push_where(&mut builder, query, operation)?;
    push_order(&mut builder, query, operation)?;
    if let Some(window) = window {
        builder.push(" LIMIT ");
        builder.push_bind(to_i64(window.limit));
        builder.push(" OFFSET ");
        builder.push_bind(to_i64(window.offset));
    }

    let mut rows = builder
        .build_query_as::<T>()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e))?;

    if !rows.is_empty() && !query.preloads().is_empty() {
        T::load_related(&mut rows, conn, query)
            .await
            .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
    }
    Ok(rows)
}

async fn count_rows<T: SqlEntity>(
    conn: &mut SqliteConnection,
    query: &Query,
    operation: RepositoryOperation,
) -> RepositoryResult<u64> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
    push_where(&mut builder, query, operation)?;

    let count: i64 = builder
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
    Ok(count.unsigned_abs())
}

/// Insert one entity's own row
///
/// Used by the store for the entity being created and by
/// [`SqlEntity::insert_related`] implementations for nested rows.
pub async fn insert_row<T: SqlEntity>(
    conn: &mut SqliteConnection,
    entity: &T,
) -> Result<u64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        T::TABLE,
        select_list::<T>()
    ));
    let mut values = metadata_values(entity.metadata());
    values.extend(entity.values());
    push_values(&mut builder, values);
    builder.push(")");

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Rows of `T` whose `column` is one of `keys`
///
/// For [`SqlEntity::load_related`] implementations: one query per association
/// instead of one per parent row.
pub async fn fetch_by_keys<T: SqlEntity>(
    conn: &mut SqliteConnection,
    column: &str,
    keys: Vec<String>,
) -> Result<Vec<T>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM {} WHERE {} IN (",
        select_list::<T>(),
        T::TABLE,
        column
    ));
    push_value(&mut builder, FilterValue::StringList(keys));
    builder.push(") ORDER BY created_at ASC, id ASC");

    builder.build_query_as::<T>().fetch_all(&mut *conn).await
}

impl<T: SqlEntity> Store<T> for SqliteStore {
    async fn create(&self, entity: T) -> RepositoryResult<T> {
        let op = RepositoryOperation::Create;
        let map = |e| RepositoryError::from_sqlx(op, e);

        let mut tx = self.pool.begin().await.map_err(map)?;
        insert_row(&mut tx, &entity).await.map_err(map)?;
        entity.insert_related(&mut tx).await.map_err(map)?;
        tx.commit().await.map_err(map)?;
        Ok(entity)
    }

    async fn find_first(&self, query: &Query) -> RepositoryResult<Option<T>> {
        let op = RepositoryOperation::FindOne;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepositoryError::from_sqlx(op, e))?;
        let rows = fetch_rows::<T>(&mut conn, query, Some(Pagination::new(0, 1)), op).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_all(&self, query: &Query, window: Option<Pagination>) -> RepositoryResult<Vec<T>> {
        let op = RepositoryOperation::FindMany;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepositoryError::from_sqlx(op, e))?;
        fetch_rows::<T>(&mut conn, query, window, op).await
    }

    async fn count(&self, query: &Query) -> RepositoryResult<u64> {
        let op = RepositoryOperation::Count;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepositoryError::from_sqlx(op, e))?;
        count_rows::<T>(&mut conn, query, op).await
    }

    async fn save(&self, entity: &T) -> RepositoryResult<u64> {
        let op = RepositoryOperation::Update;
        let meta = entity.metadata();

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", T::TABLE));
        let assignments = ["updated_at", "deleted_at", "version"]
            .into_iter()
            .chain(T::COLUMNS.iter().copied())
            .zip(
                [
                    FilterValue::from(meta.updated_at),
                    FilterValue::from(meta.deleted_at),
                    FilterValue::Integer(meta.version),
                ]
                .into_iter()
                .chain(entity.values()),
            );
        for (i, (column, value)) in assignments.enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(column);
            builder.push(" = ");
            push_value(&mut builder, value);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(meta.id.clone());
        builder.push(" AND version < ");
        builder.push_bind(meta.version);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx(op, e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: &str) -> RepositoryResult<u64> {
        let op = RepositoryOperation::Delete;
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx(op, e))?;
        Ok(result.rows_affected())
    }

    /// Count and window fetch inside one read transaction
    async fn find_page(&self, query: &Query, page: PageRequest) -> RepositoryResult<(Vec<T>, Paginator)> {
        let op = RepositoryOperation::FindManyPaginated;
        let map = |e| RepositoryError::from_sqlx(op, e);

        let mut tx = self.pool.begin().await.map_err(map)?;
        let total = count_rows::<T>(&mut tx, query, op).await?;
        let items = fetch_rows::<T>(&mut tx, query, Some(page.window()), op).await?;
        tx.commit().await.map_err(map)?;

        Ok((items, page.paginator(total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::repository::{
        ErrorCategory, FilterCondition, OrderDirection, Repository, RepositoryErrorKind,
    };
    use sqlx::sqlite::SqlitePoolOptions;

    #[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
    struct Note {
        #[sqlx(flatten)]
        metadata: Metadata,
        title: String,
        priority: i64,
    }

    impl Entity for Note {
        const NAME: &'static str = "Note";

        fn metadata(&self) -> &Metadata {
            &self.metadata
        }

        fn metadata_mut(&mut self) -> &mut Metadata {
            &mut self.metadata
        }
    }

    impl SqlEntity for Note {
        const TABLE: &'static str = "notes";
        const COLUMNS: &'static [&'static str] = &["title", "priority"];

        fn values(&self) -> Vec<FilterValue> {
            vec![self.title.clone().into(), self.priority.into()]
        }
    }

    fn note(title: &str, priority: i64) -> Note {
        Note {
            metadata: Metadata::default(),
            title: title.to_string(),
            priority,
        }
    }

    async fn repository() -> SqliteRepository<Note> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(
            "CREATE TABLE notes (
                id TEXT PRIMARY KEY NOT NULL,
                created_at TEXT,
                updated_at TEXT,
                deleted_at TEXT,
                version INTEGER NOT NULL DEFAULT 1,
                title TEXT NOT NULL UNIQUE,
                priority INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqliteStore::new(pool).repository()
    }

    async fn seed(repo: &SqliteRepository<Note>, count: i64) {
        let ctx = RequestContext::new();
        for priority in 0..count {
            repo.create(&ctx, note(&format!("note-{priority:02}"), priority))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_then_find_one_round_trips() {
        let repo = repository().await;
        let ctx = RequestContext::new();

        let created = repo.create(&ctx, note("first", 1)).await.unwrap();
        assert_eq!(created.metadata.version, 1);

        let found = repo
            .find_one(&ctx, Query::by_id(created.id()), &[])
            .await
            .unwrap();
        assert_eq!(found.title, "first");
        assert_eq!(found.priority, 1);
        assert_eq!(found.metadata.id, created.metadata.id);
        assert_eq!(found.metadata.version, 1);
    }

    #[tokio::test]
    async fn test_find_one_no_rows_is_not_found() {
        let repo = repository().await;
        let err = repo
            .find_one(
                &RequestContext::new(),
                Query::new().filter("title = ?", ["nope"]),
                &[],
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_unique_column_is_conflict() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        repo.create(&ctx, note("same", 1)).await.unwrap();

        let err = repo.create(&ctx, note("same", 2)).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert_eq!(repo.count(&ctx, Query::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_matches_find_many() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        seed(&repo, 7).await;

        let filter = Query::new().filter("priority >= ?", [3_i64]);
        let many = repo.find_many(&ctx, filter.clone(), &[]).await.unwrap();
        let count = repo.count(&ctx, filter).await.unwrap();
        assert_eq!(many.len() as u64, count);
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_find_many_orders_and_allows_empty() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        seed(&repo, 3).await;

        let ordered = repo
            .find_many(
                &ctx,
                Query::new().order_by("priority", OrderDirection::Descending),
                &[],
            )
            .await
            .unwrap();
        let priorities: Vec<i64> = ordered.iter().map(|n| n.priority).collect();
        assert_eq!(priorities, vec![2, 1, 0]);

        let empty = repo
            .find_many(&ctx, Query::new().filter("priority > ?", [100_i64]), &[])
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_in_list_filters() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        seed(&repo, 5).await;

        let some = repo
            .count(&ctx, Query::new().filter("priority IN (?)", [vec![1_i64, 3]]))
            .await
            .unwrap();
        assert_eq!(some, 2);

        let none = repo
            .count(&ctx, Query::new().filter("priority IN (?)", [Vec::<i64>::new()]))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_paginated_short_last_page() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        seed(&repo, 2).await;

        let (items, paginator) = repo
            .find_many_paginated(&ctx, Query::new(), 1, 10, &[])
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(paginator.total_rows, 2);
        assert_eq!(paginator.total_pages, 1);
    }

    #[tokio::test]
    async fn test_paginated_window() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        seed(&repo, 25).await;

        let (items, paginator) = repo
            .find_many_paginated(
                &ctx,
                Query::new().order_by("priority", OrderDirection::Ascending),
                3,
                10,
                &[],
            )
            .await
            .unwrap();
        let priorities: Vec<i64> = items.iter().map(|n| n.priority).collect();
        assert_eq!(priorities, (20..25).collect::<Vec<_>>());
        assert_eq!(paginator.current_page, 3);
        assert_eq!(paginator.total_pages, 3);
    }

    #[tokio::test]
    async fn test_update_writes_and_guards_version() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        let created = repo.create(&ctx, note("draft", 1)).await.unwrap();

        let mut edited = created.clone();
        edited.title = "final".to_string();
        edited.metadata.bump_version();
        repo.update(&ctx, edited).await.unwrap();

        let stored = repo
            .find_one(&ctx, Query::by_id(created.id()), &[])
            .await
            .unwrap();
        assert_eq!(stored.title, "final");
        assert_eq!(stored.metadata.version, 2);

        // Writing the original version again is stale.
        let err = repo.update(&ctx, created).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_update_missing_id_creates_nothing() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        let mut ghost = note("ghost", 0);
        ghost.metadata.id = "does-not-exist".to_string();
        ghost.metadata.version = 5;

        let err = repo.update(&ctx, ghost).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(repo.count(&ctx, Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        let created = repo.create(&ctx, note("gone", 1)).await.unwrap();

        repo.delete(&ctx, &created).await.unwrap();
        assert_eq!(repo.count(&ctx, Query::new()).await.unwrap(), 0);

        let err = repo.delete(&ctx, &created).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_placeholder_mismatch_is_persistence_error() {
        let repo = repository().await;
        let err = repo
            .count(
                &RequestContext::new(),
                Query::new().filter("priority = ? AND title = ?", [1_i64]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidQuery);
        assert_eq!(err.category(), ErrorCategory::Persistence);
    }

    #[tokio::test]
    async fn test_malformed_clause_surfaces_on_execution() {
        let repo = repository().await;
        let err = repo
            .find_many(
                &RequestContext::new(),
                Query::new().filter_clause("no_such_column = 1"),
                &[],
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Persistence);
        assert_eq!(err.operation, RepositoryOperation::FindMany);
    }

    #[tokio::test]
    async fn test_order_by_rejects_non_identifiers() {
        let repo = repository().await;
        let err = repo
            .find_many(
                &RequestContext::new(),
                Query::new().order_by("priority; DROP TABLE notes", OrderDirection::Ascending),
                &[],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidQuery);
    }

    #[tokio::test]
    async fn test_condition_rejects_non_identifier_field() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        seed(&repo, 2).await;

        let err = repo
            .count(
                &ctx,
                Query::new().condition(FilterCondition::eq("1 = 1 OR priority", 0_i64)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidQuery);
        assert_eq!(err.category(), ErrorCategory::Persistence);

        let matched = repo
            .count(&ctx, Query::new().condition(FilterCondition::eq("priority", 1_i64)))
            .await
            .unwrap();
        assert_eq!(matched, 1);
    }

    #[tokio::test]
    async fn test_question_mark_inside_literal_is_not_bound() {
        let repo = repository().await;
        let ctx = RequestContext::new();
        repo.create(&ctx, note("why?", 1)).await.unwrap();
        repo.create(&ctx, note("because", 2)).await.unwrap();

        let literal = repo
            .find_many(&ctx, Query::new().filter_clause("title = 'why?'"), &[])
            .await
            .unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].priority, 1);

        let mixed = repo
            .count(
                &ctx,
                Query::new().filter("title = 'why?' OR priority = ?", [2_i64]),
            )
            .await
            .unwrap();
        assert_eq!(mixed, 2);
    }

    #[test]
    fn test_select_list() {
        assert_eq!(
            select_list::<Note>(),
            "id, created_at, updated_at, deleted_at, version, title, priority"
        );
    }
}

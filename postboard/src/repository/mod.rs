//! Generic data access
//!
//! One typed contract, [`Repository<T>`], serves every entity. The layers are:
//!
//! - **Query**: [`Query`] accumulates AND-combined predicates, ordering and
//!   association preloads; [`FilterCondition`] builds common predicates.
//! - **Pagination**: [`PageRequest`] clamps the caller's page values and
//!   [`Paginator`] describes the page that came back.
//! - **Entity**: types embed [`Metadata`] and implement [`Entity`] (plus
//!   [`SqlEntity`] for the SQLite mapping).
//! - **Store**: [`Store<T>`] moves rows; [`SqliteStore`] is the SQLite one.
//! - **Repository**: [`EntityRepository`] adds pre-save hooks, cancellation,
//!   error classification and logging on top of any store.
//!
//! # Example
//!
//! ```rust,ignore
//! use postboard::context::RequestContext;
//! use postboard::repository::{OrderDirection, Query, Repository, SqliteStore};
//!
//! let store = SqliteStore::new(pool);
//! let posts = store.repository::<Post>();
//!
//! let (page, paginator) = posts
//!     .find_many_paginated(
//!         &RequestContext::new(),
//!         Query::new()
//!             .filter("account_id = ?", [account_id])
//!             .order_by("created_at", OrderDirection::Descending),
//!         1,
//!         10,
//!         &[],
//!     )
//!     .await?;
//! ```

mod entity;
mod error;
mod generic;
mod pagination;
mod query;
mod sqlite;
mod store;
mod traits;

pub use entity::{Entity, Metadata};
pub use error::{ErrorCategory, RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use generic::EntityRepository;
pub use pagination::{PageRequest, Pagination, Paginator};
pub use query::{FilterCondition, FilterOperator, FilterValue, OrderDirection, Predicate, Query};
pub use sqlite::{fetch_by_keys, insert_row, SqlEntity, SqliteRepository, SqliteStore, METADATA_COLUMNS};
pub use store::Store;
pub use traits::{Repository, RepositoryResult};

//! # postboard
//!
//! Building blocks for the postboard REST service:
//!
//! - **Repository**: one generic, typed data-access contract for every entity,
//!   with composable queries, pagination and a SQLite store
//! - **Rate limiting**: per-client token buckets with background eviction of
//!   idle clients
//! - **HTTP plumbing**: layered configuration, structured errors, JSON logging,
//!   request tracking and a server with graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use postboard::prelude::*;
//! use axum::{routing::get, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let shutdown = CancellationToken::new();
//!     let (limiter, _sweeper) = RateLimiter::spawn(&config.rate_limit, shutdown.clone())?;
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "hello" }))
//!         .layer(axum::middleware::from_fn_with_state(
//!             RateLimit::new(limiter, &config.rate_limit),
//!             RateLimit::middleware,
//!         ));
//!
//!     Server::new(config)
//!         .with_shutdown_token(shutdown)
//!         .serve(app)
//!         .await
//! }
//! ```

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod rate_limit;
pub mod repository;
pub mod responses;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, MiddlewareConfig, RateLimitConfig};
    pub use crate::context::RequestContext;
    pub use crate::database::{apply_schema, create_pool};
    pub use crate::error::{Error, ErrorResponse, Result};
    pub use crate::ids::{new_entity_id, MakeTypedRequestId, RequestId};
    pub use crate::middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer, RateLimit,
    };
    pub use crate::observability::init_tracing;
    pub use crate::rate_limit::{Decision, RateLimiter};
    pub use crate::repository::{
        Entity, EntityRepository, ErrorCategory, FilterCondition, Metadata, OrderDirection,
        Paginator, Query, Repository, RepositoryError, RepositoryResult, SqlEntity,
        SqliteRepository, SqliteStore,
    };
    pub use crate::responses::{ApiResponse, PageParams};
    pub use crate::server::Server;

    pub use axum;
    pub use tokio_util::sync::CancellationToken;
}

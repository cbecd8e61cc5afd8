//! postboard REST service: accounts, their addresses and their posts

pub mod handlers;
pub mod models;
pub mod requests;
pub mod services;
pub mod views;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use postboard::prelude::*;

use crate::models::{Account, Post, SCHEMA};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    accounts: SqliteRepository<Account>,
    posts: SqliteRepository<Post>,
    limiter: Option<RateLimiter>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Open the database, apply the schema and start the rate limiter
    ///
    /// The returned handle belongs to the limiter's eviction sweep, which
    /// stops when `shutdown` is cancelled. It is `None` when rate limiting
    /// is disabled.
    pub async fn build(
        config: Config,
        shutdown: CancellationToken,
    ) -> Result<(Self, Option<JoinHandle<()>>)> {
        let pool = create_pool(&config.database).await?;
        apply_schema(&pool, SCHEMA).await?;

        let (limiter, sweeper) = if config.rate_limit.enabled {
            let (limiter, handle) = RateLimiter::spawn(&config.rate_limit, shutdown.clone())?;
            (Some(limiter), Some(handle))
        } else {
            (None, None)
        };

        Ok((Self::new(config, pool, limiter, shutdown), sweeper))
    }

    pub fn new(
        config: Config,
        pool: SqlitePool,
        limiter: Option<RateLimiter>,
        shutdown: CancellationToken,
    ) -> Self {
        let store = SqliteStore::new(pool.clone());
        Self {
            config: Arc::new(config),
            pool,
            accounts: store.repository(),
            posts: store.repository(),
            limiter,
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn accounts(&self) -> &SqliteRepository<Account> {
        &self.accounts
    }

    pub fn posts(&self) -> &SqliteRepository<Post> {
        &self.posts
    }

    pub fn limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_ref()
    }

    /// Context for one request: cancelled on shutdown, bounded by the request timeout
    pub fn request_context(&self) -> RequestContext {
        RequestContext::child_of(&self.shutdown).with_timeout(self.config.service.timeout())
    }
}

/// All routes, with rate limiting on the API routes
///
/// Health probes are never rate limited.
pub fn router(state: AppState) -> Router {
    let mut api = Router::new()
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route("/users/count", get(handlers::users::count_users))
        .route("/users/{id}", get(handlers::users::get_user))
        .route(
            "/posts",
            post(handlers::posts::create_post).get(handlers::posts::list_posts),
        )
        .route("/posts/{id}", delete(handlers::posts::delete_post));

    if let Some(limiter) = state.limiter() {
        let rate_limit = RateLimit::new(limiter.clone(), &state.config().rate_limit);
        api = api.layer(axum::middleware::from_fn_with_state(
            rate_limit,
            RateLimit::middleware,
        ));
    }

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::readiness))
        .merge(api)
        .with_state(state)
}

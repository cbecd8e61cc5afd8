//! Database connection pool management

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::{
    config::DatabaseConfig,
    error::{Error, Result},
};

/// Create a SQLite connection pool with retry logic
///
/// Retries follow the configured `max_retries` with exponential backoff.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    create_pool_with_retries(config, config.max_retries).await
}

/// Create a SQLite connection pool with configurable retries
///
/// Uses exponential backoff strategy for retries
async fn create_pool_with_retries(config: &DatabaseConfig, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = backoff_delay(base_delay, attempt);

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based)
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base_delay.saturating_mul(multiplier)
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            Error::Internal(format!(
                "Invalid database URL '{}': {}",
                config.url, e
            ))
        })?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout());

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .max_lifetime(Some(config.max_lifetime()))
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::Internal(format!(
                "Failed to open database at '{}': {}\n\n\
                Troubleshooting:\n\
                1. Check the URL format: sqlite://path/to/file.db or sqlite::memory:\n\
                2. Verify the parent directory exists and is writable\n\
                3. Make sure no other process holds an exclusive lock on the file\n\n\
                Original error: {}",
                config.url,
                categorize_db_error(&e),
                e
            ))
        })?;

    Ok(pool)
}

/// Execute a batch of DDL statements
///
/// Statements should be idempotent (`CREATE TABLE IF NOT EXISTS ...`) since
/// this runs on every start.
pub async fn apply_schema(pool: &SqlitePool, schema: &str) -> Result<()> {
    sqlx::raw_sql(schema).execute(pool).await.map_err(|e| {
        Error::Internal(format!(
            "Failed to apply schema ({}): {}",
            categorize_db_error(&e),
            e
        ))
    })?;

    tracing::info!("Database schema applied");
    Ok(())
}

/// Categorize database error for better user guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Configuration error",
        Error::Database(_) => "Database query error",
        Error::Io(_) => "File I/O error - check path and permissions",
        Error::PoolTimedOut => "Connection pool timeout - database may be locked",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            max_retries: 0,
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_create_pool_enables_foreign_keys() {
        let pool = create_pool(&memory_config()).await.unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_apply_schema_is_repeatable() {
        let pool = create_pool(&memory_config()).await.unwrap();
        let schema = "CREATE TABLE IF NOT EXISTS widgets (id TEXT PRIMARY KEY);";

        apply_schema(&pool, schema).await.unwrap();
        apply_schema(&pool, schema).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM widgets")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postboard.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            ..memory_config()
        };

        let pool = create_pool(&config).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_retry() {
        let config = DatabaseConfig {
            url: "postgres://nope".to_string(),
            ..memory_config()
        };

        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}

//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: POSTBOARD_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/postboard/{service_name}/config.toml
//! 4. System directory: /etc/postboard/{service_name}/config.toml
//! 5. Default values
//!
//! For example `POSTBOARD_RATE_LIMIT__BURST=20` overrides `rate_limit.burst`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "POSTBOARD_";
const CONFIG_DIR: &str = "postboard";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Pool acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum lifetime of a pooled connection in seconds
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// How long SQLite waits on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_secs: default_connection_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Per-client token bucket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Turn admission control on or off
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tokens refilled per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Bucket capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Idle time after which a client's bucket is evicted, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How often idle clients are swept, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Key clients by the first `X-Forwarded-For` entry instead of the peer address
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            trust_forwarded_for: false,
        }
    }
}

impl RateLimitConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Reject settings the limiter cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "rate_limit.requests_per_second must be positive, got {}",
                self.requests_per_second
            )));
        }
        // One token must accrue within a representable wait
        if Duration::try_from_secs_f64(1.0 / self.requests_per_second).is_err() {
            return Err(Error::InvalidConfig(format!(
                "rate_limit.requests_per_second is too small, got {}",
                self.requests_per_second
            )));
        }
        if self.burst < 1 {
            return Err(Error::InvalidConfig(
                "rate_limit.burst must be at least 1".to_string(),
            ));
        }
        if self.ttl_secs == 0 {
            return Err(Error::InvalidConfig(
                "rate_limit.ttl_secs must be positive".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "rate_limit.sweep_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_database_url() -> String {
    "sqlite://postboard.db".to_string()
}

fn default_max_connections() -> u32 {
    100
}

fn default_min_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_max_lifetime() -> u64 {
    3600
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_requests_per_second() -> f64 {
    5.0
}

fn default_burst() -> u32 {
    10
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

impl Config {
    /// Load configuration for the current binary
    ///
    /// The service name is the executable's file stem.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "postboard".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut defaults = Config::default();
        defaults.service.name = service_name.to_string();
        let mut figment = Figment::new().merge(Serialized::defaults(defaults));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.rate_limit.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.rate_limit.validate()?;
        Ok(config)
    }

    /// Config file candidates, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        if let Some(path) = xdg_dirs.find_config_file(Path::new(service_name).join("config.toml")) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "postboard".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            database: DatabaseConfig::default(),
            rate_limit: RateLimitConfig::default(),
            middleware: MiddlewareConfig::default(),
        }
    }
}

//! HTTP server with graceful shutdown

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::Result,
    middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
};

/// Server instance
pub struct Server {
    config: Config,
    shutdown: CancellationToken,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Share a shutdown token with the rest of the application
    ///
    /// The token is cancelled when a shutdown signal arrives, and cancelling
    /// it from elsewhere stops the server.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the server with the given router
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));
        let listener = TcpListener::bind(&addr).await?;
        self.serve_with_listener(listener, app).await
    }

    /// Run the server on an already bound listener
    pub async fn serve_with_listener(self, listener: TcpListener, app: Router) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!("Starting {} on {}", self.config.service.name, addr);

        self.log_middleware_config();
        let app = self.apply_middleware(app);

        tracing::info!("Server listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(self.shutdown.clone()))
        .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Wrap `app` in the standard layer stack
    ///
    /// Layers are applied in reverse order (the last one is outermost).
    pub fn apply_middleware(&self, app: Router) -> Router {
        let body_limit = self.config.middleware.body_limit_mb * 1024 * 1024;

        let app = match self.build_cors_layer() {
            Some(cors) => app.layer(cors),
            None => app,
        };

        let app = if self.config.middleware.compression {
            app.layer(CompressionLayer::new())
        } else {
            app
        };

        let app = app
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                self.config.service.timeout(),
            ))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(sensitive_headers_layer())
            .layer(request_id_propagation_layer())
            .layer(request_id_layer());

        if self.config.middleware.catch_panic {
            app.layer(CatchPanicLayer::new())
        } else {
            app
        }
    }

    /// Log middleware configuration for debugging
    fn log_middleware_config(&self) {
        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: {}", on_off(self.config.middleware.catch_panic));
        tracing::info!("  - Request ID tracking: enabled");
        tracing::info!("  - Sensitive header masking: enabled");
        tracing::info!(
            "  - Request body limit: {} MB",
            self.config.middleware.body_limit_mb
        );
        tracing::info!("  - Compression: {}", on_off(self.config.middleware.compression));
        tracing::info!("  - CORS mode: {}", self.config.middleware.cors_mode);
        tracing::info!(
            "  - Request timeout: {} seconds",
            self.config.service.timeout_secs
        );

        let rate_limit = &self.config.rate_limit;
        if rate_limit.enabled {
            tracing::info!(
                "  - Rate limiting: {} req/sec per client (burst: {}, idle ttl: {}s)",
                rate_limit.requests_per_second,
                rate_limit.burst,
                rate_limit.ttl_secs
            );
        } else {
            tracing::info!("  - Rate limiting: disabled");
        }
    }

    /// Build CORS layer based on configuration
    fn build_cors_layer(&self) -> Option<CorsLayer> {
        match self.config.middleware.cors_mode.as_str() {
            "permissive" => {
                tracing::debug!("Enabling permissive CORS");
                Some(CorsLayer::permissive())
            }
            "restrictive" => {
                tracing::debug!("Enabling restrictive CORS (default deny)");
                Some(CorsLayer::new())
            }
            "disabled" => {
                tracing::debug!("CORS disabled");
                None
            }
            _ => {
                tracing::warn!(
                    "Unknown CORS mode: {}, defaulting to permissive",
                    self.config.middleware.cors_mode
                );
                Some(CorsLayer::permissive())
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Wait for SIGTERM, SIGINT or cancellation of `token`, then cancel `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
        _ = token.cancelled() => {
            tracing::info!("Shutdown requested, starting graceful shutdown");
        },
    }

    // Stops background tasks sharing the token
    token.cancel();
    tracing::info!("Shutdown signal received, draining requests...");
}

//! postboard REST service binary

use anyhow::Context;
use postboard::prelude::*;
use postboard_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("loading configuration")?;

    // Initialize tracing
    init_tracing(&config)?;

    tracing::info!(
        environment = %config.service.environment,
        "Starting postboard API service"
    );

    // Cancelled on SIGINT/SIGTERM; stops the server and the limiter sweep
    let shutdown = CancellationToken::new();

    let (state, sweeper) = AppState::build(config.clone(), shutdown.clone())
        .await
        .context("building application state")?;
    let app = router(state);

    Server::new(config)
        .with_shutdown_token(shutdown.clone())
        .serve(app)
        .await?;

    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "rate limiter sweep ended abnormally");
        }
    }

    Ok(())
}

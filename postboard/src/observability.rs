//! Structured logging

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install the global JSON subscriber
///
/// `RUST_LOG` is not consulted; the filter comes from `service.log_level`,
/// falling back to `info` when the directive does not parse. Calling this a
/// second time is a no-op.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Tracing initialized for service: {}", config.service.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let mut config = Config::default();
        config.service.log_level = "not a [valid directive".to_string();

        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}

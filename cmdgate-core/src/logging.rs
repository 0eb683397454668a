// Logging setup

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::AppResult;

/// Installs the global subscriber.
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_logging(default_level: &str) -> AppResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?;

    info!("logging initialised");
    Ok(())
}

use tracing_subscriber::EnvFilter;

use crate::errors::BootError;

/// `RUST_LOG` wins over the configured
/// level. Debug mode raises the configured
/// level to `debug`.
pub fn init_tracing(level: &str, debug: bool) -> Result<(), BootError> {
    let level = if debug { "debug" } else { level.trim() };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| BootError::Logging(format!("invalid logging.level: {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| BootError::Logging(e.to_string()))
}

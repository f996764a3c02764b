/*!
 * Logging setup for the Flowgate driver.
 *
 * Thin tracing initialization kept consistent across binaries and demos.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{DeviceError, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_filter("info")
}

/// Initialize the logging system with a specific filter
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "flowgate_driver=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| DeviceError::Config(format!("failed to initialize logging: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        // Repeated init in one process fails; first call wins.
        let _ = init();
        let _ = init();
    }
}

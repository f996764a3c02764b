/*!
 * Flowgate Driver
 *
 * This crate drives a mass-flow-control device over a byte-oriented serial
 * transport: session handling with a single serialized exchange primitive,
 * valve and flow controllers, a background flow poll with broadcast
 * fan-out, and the [`MfcDevice`] facade tying them together.
 *
 * The wire protocol itself lives in `flowgate-proto`.
 */

#![warn(missing_docs)]

pub mod config;
pub mod device;
pub mod error;
pub mod flow;
pub mod logging;
pub mod poller;
pub mod session;
pub mod transport;
pub mod valve;

pub use config::DriverConfig;
pub use device::MfcDevice;
pub use error::{DeviceError, Result};
pub use flow::{FlowController, SetFlowOutcome};
pub use poller::{FlowUpdate, PollingScheduler};
pub use session::{DeviceIdentity, DeviceSession};
pub use transport::Transport;
pub use valve::ValveController;

// Re-export the protocol crate for callers that build frames directly.
pub use flowgate_proto as proto;

/// Flowgate driver crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization: sets up logging and announces the version.
pub fn init() -> Result<()> {
    logging::init()?;
    tracing::info!("Flowgate driver {} initialized", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

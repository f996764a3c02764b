/*!
 * Error types for the Flowgate driver crate.
 */
use thiserror::Error;

use flowgate_proto::{FlowOutOfRange, FrameError, FRAME_LEN};

/// Error type for device operations.
///
/// A device reporting a state an operation does not expect (for example a
/// set-flow attempt while the valve is not in control mode) is a normal
/// outcome, not an error, and is surfaced through the operation's return
/// value instead of a variant here.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The response frame failed validation (corrupt or garbled read)
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Fewer than a full frame's bytes arrived within the response wait
    #[error("timed out waiting for response: {available} of {FRAME_LEN} bytes available")]
    Timeout {
        /// Bytes buffered on the transport when the wait expired
        available: usize,
    },

    /// The underlying byte stream failed to read or write.
    ///
    /// The transport's state is no longer trustworthy after this; callers
    /// should tear the session down and reconnect.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The initial handshake did not establish communication
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The requested flow target is outside the programmable range
    #[error("invalid flow target: {0}")]
    InvalidTarget(#[from] FlowOutOfRange),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    /// Whether the error came from a single corrupt or missing response,
    /// as opposed to a failed transport. Exchange-level errors leave the
    /// session usable; transport errors do not.
    pub fn is_exchange_error(&self) -> bool {
        matches!(self, DeviceError::Frame(_) | DeviceError::Timeout { .. })
    }
}

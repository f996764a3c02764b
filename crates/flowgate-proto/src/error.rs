/*!
 * Error types for the Flowgate protocol crate.
 */
use thiserror::Error;

use crate::frame::FRAME_LEN;

/// Error type for frame decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The response is not a complete frame
    #[error("truncated response: expected {FRAME_LEN} bytes, got {0}")]
    Truncated(usize),

    /// The trailing checksum does not match the computed sum
    #[error("checksum mismatch: computed {computed:#06x}, received {received:#06x}, raw bytes {raw:02x?}")]
    Checksum {
        /// Sum computed over the 8 data bytes
        computed: u16,
        /// Checksum carried in the frame trailer
        received: u16,
        /// The raw frame, kept for diagnostics
        raw: Vec<u8>,
    },
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, FrameError>;

/*!
 * Byte-stream transport boundary.
 *
 * The driver does not open or configure ports itself; it is handed an
 * already-configured byte stream and owns it for the life of the session.
 * Port discovery and parameter negotiation (baud rate and friends) stay
 * with the caller.
 */
use std::fmt::Debug;
use std::io;

use async_trait::async_trait;

pub mod mock;

#[cfg(feature = "serial")]
pub mod serial;

pub use mock::MockTransport;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

/// A half-duplex byte stream to the device.
///
/// The wire carries a single outstanding request at a time; serialization
/// of access is the session's job, so implementations may assume one caller.
#[async_trait]
pub trait Transport: Send + Debug {
    /// Write a complete frame and flush it onto the wire.
    async fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of bytes buffered and ready to read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one byte. Only called once `bytes_available` covers the read,
    /// so a well-behaved transport returns promptly.
    async fn read_byte(&mut self) -> io::Result<u8>;

    /// Release the underlying stream. Best effort; never fails.
    fn close(&mut self);
}

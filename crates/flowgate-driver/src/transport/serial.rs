/*!
 * Serial-port transport backed by the `serialport` crate.
 *
 * The port must already be configured by the caller; [`SerialTransport::open`]
 * is a convenience that applies a short read timeout and nothing else.
 */
use std::io::{self, Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use serialport::SerialPort;
use tracing::debug;

use super::Transport;

/// [`Transport`] over a system serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl SerialTransport {
    /// Wrap an already-opened port.
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Open a port by name at the given baud rate.
    pub fn open(path: &str, baud: u32) -> io::Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(io::Error::from)?;
        debug!(port = path, baud, "serial port opened");
        Ok(Self { port })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn close(&mut self) {
        // Dropping the handle releases the port; nothing else to do.
        debug!(port = ?self.port.name(), "serial port released");
    }
}

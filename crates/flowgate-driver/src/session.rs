/*!
 * Device session: the serialized exchange primitive.
 *
 * The wire is half-duplex with a single outstanding request, so every
 * exchange, whether from a user command or the background poll, goes
 * through one exclusive lock. Multi-exchange operations hold the
 * [`SessionGuard`] for their whole sequence, which keeps another caller
 * from slipping an exchange in between their steps.
 */
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{trace, warn};

use flowgate_proto::{Command, ResponseFrame, FRAME_LEN};

use crate::config::DriverConfig;
use crate::error::{DeviceError, Result};
use crate::transport::Transport;

/// Identity established by the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Device serial number, as reported in the handshake response.
    pub serial: String,
    /// Caller-supplied identifier of the port the device sits on.
    pub port: String,
}

/// Owner of the transport and of the session-wide exclusive lock.
#[derive(Debug)]
pub struct DeviceSession {
    transport: Mutex<Box<dyn Transport>>,
    port_id: String,
    config: DriverConfig,
}

impl DeviceSession {
    /// Take ownership of a configured transport.
    pub fn new(
        transport: Box<dyn Transport>,
        port_id: impl Into<String>,
        config: DriverConfig,
    ) -> Self {
        Self {
            transport: Mutex::new(transport),
            port_id: port_id.into(),
            config,
        }
    }

    /// Acquire the session lock. Held for the duration of one logical
    /// operation, which may span several exchanges.
    pub async fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            io: self.transport.lock().await,
            config: &self.config,
        }
    }

    /// Perform the initial handshake and extract the device identity.
    pub async fn handshake(&self) -> Result<DeviceIdentity> {
        let mut io = self.lock().await;
        let response = io.exchange(&Command::Handshake).await?;
        let identity = DeviceIdentity {
            serial: response.serial_number().to_string(),
            port: self.port_id.clone(),
        };
        trace!(serial = %identity.serial, port = %identity.port, "handshake complete");
        Ok(identity)
    }

    /// Unconditionally release the transport. The session is unusable
    /// afterwards; exchanges fail at the transport layer.
    pub async fn release(&self) {
        self.transport.lock().await.close();
    }
}

/// Exclusive access to the transport for one logical operation.
pub struct SessionGuard<'a> {
    io: MutexGuard<'a, Box<dyn Transport>>,
    config: &'a DriverConfig,
}

impl SessionGuard<'_> {
    /// One write-then-await-response cycle.
    ///
    /// Writes the encoded frame, then probes transport readiness until a
    /// full 10-byte response is buffered or the configured wait (500 ms by
    /// default) expires. Expiry raises [`DeviceError::Timeout`] without
    /// reading; the raw reads only start once the whole frame is buffered,
    /// so they cannot stall on an empty line. No retry is performed at
    /// this layer.
    pub async fn exchange(&mut self, command: &Command) -> Result<ResponseFrame> {
        let frame = command.encode();
        trace!(
            command = command.name(),
            frame = %format!("{:02x?}", frame),
            "sending command"
        );
        self.io.write_frame(&frame).await?;

        let deadline = Instant::now() + self.config.response_wait();
        loop {
            let available = self.io.bytes_available()?;
            if available >= FRAME_LEN {
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    command = command.name(),
                    available, "response did not arrive within the wait bound"
                );
                return Err(DeviceError::Timeout { available });
            }
            tokio::time::sleep(self.config.probe_interval()).await;
        }

        let mut raw = [0u8; FRAME_LEN];
        for byte in raw.iter_mut() {
            *byte = self.io.read_byte().await?;
        }
        trace!(response = %format!("{:02x?}", raw), "received response");

        Ok(ResponseFrame::decode(&raw)?)
    }
}

/*!
 * Valve control.
 *
 * Each operation is a two-exchange sequence under one lock acquisition:
 * the mode command, then a confirming status query. The acknowledgment of
 * the command alone is never treated as success; only the state the
 * device reports afterwards is authoritative.
 */
use std::sync::Arc;

use tracing::{debug, warn};

use flowgate_proto::{Command, ValveState};

use crate::error::Result;
use crate::session::DeviceSession;

/// Issues valve-mode commands and confirms the resulting state.
#[derive(Debug, Clone)]
pub struct ValveController {
    session: Arc<DeviceSession>,
}

impl ValveController {
    /// Create a controller on top of an established session.
    pub fn new(session: Arc<DeviceSession>) -> Self {
        Self { session }
    }

    /// Drive the valve fully shut. `Ok(true)` iff the device confirms
    /// `Closed`; a corrupt or missing response on either exchange is an
    /// error, not a `false`.
    pub async fn close(&self) -> Result<bool> {
        self.drive(Command::CloseValve, ValveState::Closed).await
    }

    /// Drive the valve fully open, confirming `Opened`.
    pub async fn open(&self) -> Result<bool> {
        self.drive(Command::OpenValve, ValveState::Opened).await
    }

    /// Hand the valve to the device's own regulation, confirming `Control`.
    pub async fn set_control_mode(&self) -> Result<bool> {
        self.drive(Command::ControlValve, ValveState::Control).await
    }

    async fn drive(&self, command: Command, expected: ValveState) -> Result<bool> {
        let mut io = self.session.lock().await;
        io.exchange(&command).await?;
        let status = io.exchange(&Command::GetStatus).await?;
        let state = status.valve_state();
        if state == expected {
            debug!(command = command.name(), state = %state, "valve state confirmed");
            Ok(true)
        } else {
            warn!(
                command = command.name(),
                expected = %expected,
                state = %state,
                "valve did not reach the requested state"
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::transport::MockTransport;
    use flowgate_proto::frame;

    const ACK: [u8; 8] = [0x20, 0, 0, 0, 0, 0, 0, 0x01];

    fn status_response(status_byte: u8) -> [u8; 10] {
        frame::encode([0x01, status_byte, 0, 0, 0, 0, 0, 0x01])
    }

    fn controller(transport: MockTransport) -> ValveController {
        let config = DriverConfig {
            response_wait_ms: 50,
            probe_interval_ms: 1,
            ..DriverConfig::default()
        };
        ValveController::new(Arc::new(DeviceSession::new(
            Box::new(transport),
            "COM1",
            config,
        )))
    }

    #[tokio::test]
    async fn close_confirms_via_status_read() {
        let (transport, handle) = MockTransport::new();
        handle.push_response(frame::encode(ACK));
        handle.push_response(status_response(0b0000_1000)); // closed

        assert!(controller(transport).close().await.unwrap());
        assert_eq!(handle.written_opcodes(), vec![0x20, 0x01]);
    }

    #[tokio::test]
    async fn open_reports_false_when_state_disagrees() {
        let (transport, handle) = MockTransport::new();
        handle.push_response(frame::encode(ACK));
        handle.push_response(status_response(0b0000_1000)); // still closed

        assert!(!controller(transport).open().await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_ack_propagates_as_error_not_false() {
        let (transport, handle) = MockTransport::new();
        let mut ack = frame::encode(ACK);
        ack[8] ^= 0x01;
        handle.push_response(ack);

        let err = controller(transport).close().await.unwrap_err();
        assert!(err.is_exchange_error());
        // the confirming status query was never issued
        assert_eq!(handle.written_opcodes(), vec![0x20]);
    }

    #[tokio::test]
    async fn control_mode_confirms_control_state() {
        let (transport, handle) = MockTransport::new();
        handle.push_response(frame::encode(ACK));
        handle.push_response(status_response(0b0000_0000)); // control

        assert!(controller(transport).set_control_mode().await.unwrap());
    }
}

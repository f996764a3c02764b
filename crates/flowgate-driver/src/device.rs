/*!
 * Device facade.
 *
 * [`MfcDevice`] aggregates the session, the valve and flow controllers and
 * the polling scheduler behind one surface. All exchanges, user commands
 * and background polls alike, funnel through the session's exclusive lock;
 * operations are totally ordered by lock acquisition and an issued
 * exchange always runs to completion.
 */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::DriverConfig;
use crate::error::{DeviceError, Result};
use crate::flow::{FlowController, SetFlowOutcome};
use crate::poller::{FlowUpdate, PollingScheduler};
use crate::session::{DeviceIdentity, DeviceSession};
use crate::transport::Transport;
use crate::valve::ValveController;

/// A connected mass-flow-control device.
///
/// Created by [`MfcDevice::connect`] once the handshake has succeeded; owns
/// the transport until [`MfcDevice::shutdown`].
#[derive(Debug)]
pub struct MfcDevice {
    session: Arc<DeviceSession>,
    valve: ValveController,
    flow: FlowController,
    poller: PollingScheduler,
    identity: DeviceIdentity,
    shut_down: AtomicBool,
}

impl MfcDevice {
    /// Establish communication over an already-configured transport.
    ///
    /// Performs the handshake, then drives the valve shut so the device
    /// starts from a known safe state, as the physical procedure requires.
    /// On any failure the transport is released before the error is
    /// returned. Polling does not start automatically; call
    /// [`start_polling`](Self::start_polling).
    pub async fn connect(
        transport: Box<dyn Transport>,
        port_id: impl Into<String>,
        config: DriverConfig,
    ) -> Result<Self> {
        let port_id = port_id.into();
        let session = Arc::new(DeviceSession::new(transport, port_id.clone(), config.clone()));

        let identity = match session.handshake().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(port = %port_id, error = %e, "handshake failed");
                session.release().await;
                return Err(match e {
                    e if e.is_exchange_error() => {
                        DeviceError::Handshake(format!("no valid handshake response: {}", e))
                    }
                    e => e,
                });
            }
        };
        info!(serial = %identity.serial, port = %identity.port, "device connected");

        let valve = ValveController::new(session.clone());
        match valve.close().await {
            Ok(true) => {}
            Ok(false) => {
                warn!(serial = %identity.serial, "valve did not close during startup");
                session.release().await;
                return Err(DeviceError::Handshake(
                    "device did not reach a safe closed state".to_string(),
                ));
            }
            Err(e) => {
                session.release().await;
                return Err(e);
            }
        }

        let flow = FlowController::new(session.clone());
        let poller = PollingScheduler::new(
            flow.clone(),
            identity.serial.clone(),
            config.poll_interval(),
            config.update_capacity,
        );

        Ok(Self {
            session,
            valve,
            flow,
            poller,
            identity,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Identity established by the handshake.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Drive the valve fully open; true iff the device confirms it.
    pub async fn open(&self) -> Result<bool> {
        self.valve.open().await
    }

    /// Drive the valve fully shut; true iff the device confirms it.
    pub async fn close_valve(&self) -> Result<bool> {
        self.valve.close().await
    }

    /// Hand the valve to the device's own regulation; true iff confirmed.
    pub async fn set_control_mode(&self) -> Result<bool> {
        self.valve.set_control_mode().await
    }

    /// Program a new flow target, in percent of full scale.
    pub async fn set_flow(&self, percent: f64) -> Result<SetFlowOutcome> {
        self.flow.set_flow(percent).await
    }

    /// Read the live flow once, in percent (NaN on a corrupt response).
    pub async fn read_flow(&self) -> Result<f64> {
        self.flow.read_flow().await
    }

    /// Start the background flow poll.
    pub fn start_polling(&self) {
        self.poller.start();
    }

    /// Stop the background flow poll, letting an in-flight read finish.
    pub async fn stop_polling(&self) {
        self.poller.stop().await;
    }

    /// Subscribe to polled flow updates. Dropping the receiver
    /// unsubscribes; slow receivers lose the oldest samples.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowUpdate> {
        self.poller.subscribe()
    }

    /// Tear the session down: stop polling, make a best-effort attempt to
    /// close the valve, then release the transport unconditionally.
    /// Idempotent; later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(serial = %self.identity.serial, "shutting down device session");

        self.poller.stop().await;

        match self.valve.close().await {
            Ok(true) => {}
            Ok(false) => warn!(serial = %self.identity.serial, "valve not confirmed closed at shutdown"),
            Err(e) => warn!(serial = %self.identity.serial, error = %e, "valve close failed at shutdown"),
        }

        self.session.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use flowgate_proto::frame;

    fn quick_config() -> DriverConfig {
        DriverConfig {
            response_wait_ms: 50,
            probe_interval_ms: 1,
            poll_interval_ms: 10,
            ..DriverConfig::default()
        }
    }

    fn handshake_response(serial: u16) -> [u8; 10] {
        frame::encode([0x19, 0, 0, 0, 0, (serial >> 8) as u8, serial as u8, 0x01])
    }

    fn status_response(status_byte: u8) -> [u8; 10] {
        frame::encode([0x01, status_byte, 0, 0, 0, 0, 0, 0x01])
    }

    fn ack(opcode: u8) -> [u8; 10] {
        frame::encode([opcode, 0, 0, 0, 0, 0, 0, 0x01])
    }

    fn script_connect(handle: &crate::transport::mock::MockHandle, serial: u16) {
        handle.push_response(handshake_response(serial));
        handle.push_response(ack(0x20)); // close command ack
        handle.push_response(status_response(0b0000_1000)); // closed
    }

    #[tokio::test]
    async fn connect_handshakes_and_closes_valve() {
        let (transport, handle) = MockTransport::new();
        script_connect(&handle, 2000);

        let device = MfcDevice::connect(Box::new(transport), "COM3", quick_config())
            .await
            .unwrap();
        assert_eq!(device.identity().serial, "2000");
        assert_eq!(device.identity().port, "COM3");
        assert_eq!(handle.written_opcodes(), vec![0x19, 0x20, 0x01]);
    }

    #[tokio::test]
    async fn connect_fails_and_releases_transport_when_device_is_silent() {
        let (transport, handle) = MockTransport::new();

        let err = MfcDevice::connect(Box::new(transport), "COM3", quick_config())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Handshake(_)));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn connect_fails_when_valve_refuses_to_close() {
        let (transport, handle) = MockTransport::new();
        handle.push_response(handshake_response(1));
        handle.push_response(ack(0x20));
        handle.push_response(status_response(0b0000_0100)); // still opened

        let err = MfcDevice::connect(Box::new(transport), "COM3", quick_config())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Handshake(_)));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn shutdown_closes_valve_then_releases_transport() {
        let (transport, handle) = MockTransport::new();
        script_connect(&handle, 77);

        let device = MfcDevice::connect(Box::new(transport), "COM3", quick_config())
            .await
            .unwrap();

        handle.push_response(ack(0x20));
        handle.push_response(status_response(0b0000_1000));
        device.shutdown().await;
        assert!(handle.is_closed());

        // idempotent
        device.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_releases_transport_even_if_close_fails() {
        let (transport, handle) = MockTransport::new();
        script_connect(&handle, 77);

        let device = MfcDevice::connect(Box::new(transport), "COM3", quick_config())
            .await
            .unwrap();

        // no responses queued: the shutdown close times out
        device.shutdown().await;
        assert!(handle.is_closed());
    }
}

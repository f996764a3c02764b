//! Drives a simulated MFC through the full device surface: connect,
//! valve modes, set-flow, and a few polled flow updates.

use anyhow::Result;

use flowgate_driver::transport::MockTransport;
use flowgate_driver::{logging, DriverConfig, MfcDevice};
use flowgate_proto::frame;

use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_with_filter("debug")?;

    // Script a device on an in-memory transport. Swap in
    // `SerialTransport::open("/dev/ttyUSB0", 9600)?` (feature `serial`)
    // to talk to real hardware.
    let (transport, handle) = MockTransport::new();
    let mut mode: u8 = 0b0000_0100; // opened
    let mut setpoint: u16 = 0;
    handle.set_responder(move |cmd| {
        let data = match cmd[0] {
            0x19 => [0x19, 0, 0, 0, 0, 0x07, 0xD0, 0x01],
            0x01 => [0x01, mode, 0, 0, 0, 0, 0, 0x01],
            0x20 => {
                mode = match cmd[2] {
                    0x01 => 0b0000_0100,
                    0x02 => 0b0000_1000,
                    _ => 0,
                };
                [0x20, 0, 0, 0, 0, 0, 0, 0x01]
            }
            0x25 => {
                setpoint = u16::from_be_bytes([cmd[2], cmd[3]]);
                [0x25, 0, 0, 0, 0, 0, 0, 0x01]
            }
            _ => [
                0x11,
                0,
                0x04,
                0xD2,
                (setpoint >> 8) as u8,
                setpoint as u8,
                0,
                0x01,
            ],
        };
        Some(frame::encode(data).to_vec())
    });

    let config = DriverConfig {
        poll_interval_ms: 500,
        ..DriverConfig::default()
    };
    let device = MfcDevice::connect(Box::new(transport), "SIM0", config).await?;
    info!(
        serial = %device.identity().serial,
        port = %device.identity().port,
        "connected"
    );

    info!("control mode confirmed: {}", device.set_control_mode().await?);
    info!("set 42.5%: {:?}", device.set_flow(42.5).await?);
    info!("live flow: {:.2}%", device.read_flow().await?);

    let mut updates = device.subscribe();
    device.start_polling();
    for _ in 0..3 {
        let update = updates.recv().await?;
        info!(
            serial = %update.serial,
            percent = update.percent,
            "polled flow update"
        );
    }
    device.stop_polling().await;

    device.shutdown().await;
    Ok(())
}

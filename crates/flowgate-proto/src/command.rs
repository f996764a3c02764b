/*!
 * Command set for the mass-flow-control device.
 *
 * Commands are immutable 8-byte templates: an opcode in byte 0, payload in
 * bytes 2-3 where a command takes one, and the fixed terminator 0x01 in
 * byte 7. Byte 1 and bytes 4-6 are reserved and stay zero.
 */
use crate::flow::FlowSetpoint;
use crate::frame::{self, DATA_LEN, FRAME_LEN};

/// Opcode of the handshake command.
pub const OP_HANDSHAKE: u8 = 0x19;
/// Opcode of the status query.
pub const OP_GET_STATUS: u8 = 0x01;
/// Opcode of the flow query.
pub const OP_GET_FLOW: u8 = 0x11;
/// Opcode shared by the three valve-mode commands.
pub const OP_SET_VALVE: u8 = 0x20;
/// Opcode of the set-flow command.
pub const OP_SET_FLOW: u8 = 0x25;

/// Fixed terminator carried in data byte 7 of every command.
const TERMINATOR: u8 = 0x01;

/// A command understood by the device.
///
/// [`Command::encode`] produces the full wire frame; the checksum trailer
/// is always derived from the data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Initial exchange; the response carries the device serial number.
    Handshake,
    /// Query the valve status word.
    GetStatus,
    /// Query the live flow reading and the confirmed set-point.
    GetFlow,
    /// Drive the valve fully open.
    OpenValve,
    /// Drive the valve fully shut.
    CloseValve,
    /// Hand the valve to the device's own flow regulation.
    ControlValve,
    /// Program a new flow target, as a validated percentage of full scale.
    SetFlow(FlowSetpoint),
}

impl Command {
    /// The 8 data bytes of this command, before the checksum.
    pub fn data(&self) -> [u8; DATA_LEN] {
        let mut data = [0u8; DATA_LEN];
        data[7] = TERMINATOR;
        match self {
            Command::Handshake => data[0] = OP_HANDSHAKE,
            Command::GetStatus => data[0] = OP_GET_STATUS,
            Command::GetFlow => data[0] = OP_GET_FLOW,
            Command::OpenValve => {
                data[0] = OP_SET_VALVE;
                data[2] = 0x01;
            }
            Command::CloseValve => {
                data[0] = OP_SET_VALVE;
                data[2] = 0x02;
            }
            Command::ControlValve => {
                data[0] = OP_SET_VALVE;
                // payload byte 2 stays 0x00: control mode
            }
            Command::SetFlow(target) => {
                data[0] = OP_SET_FLOW;
                let raw = target.raw().to_be_bytes();
                data[2] = raw[0];
                data[3] = raw[1];
            }
        }
        data
    }

    /// Encode into the 10-byte wire frame, checksum appended.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        frame::encode(self.data())
    }

    /// Short command name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Handshake => "handshake",
            Command::GetStatus => "get-status",
            Command::GetFlow => "get-flow",
            Command::OpenValve => "open-valve",
            Command::CloseValve => "close-valve",
            Command::ControlValve => "control-valve",
            Command::SetFlow(_) => "set-flow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valve_commands_share_opcode_and_differ_in_payload() {
        assert_eq!(Command::OpenValve.data(), [0x20, 0, 0x01, 0, 0, 0, 0, 0x01]);
        assert_eq!(Command::CloseValve.data(), [0x20, 0, 0x02, 0, 0, 0, 0, 0x01]);
        assert_eq!(
            Command::ControlValve.data(),
            [0x20, 0, 0x00, 0, 0, 0, 0, 0x01]
        );
    }

    #[test]
    fn set_flow_places_target_big_endian() {
        let target = FlowSetpoint::new(50.0).unwrap();
        let data = Command::SetFlow(target).data();
        assert_eq!(data[0], OP_SET_FLOW);
        // 50.00% -> 5000 -> 0x1388
        assert_eq!((data[2], data[3]), (0x13, 0x88));
    }

    #[test]
    fn handshake_frame_carries_checksum() {
        let frame = Command::Handshake.encode();
        assert_eq!(frame[0], OP_HANDSHAKE);
        // 0x19 + 0x01 = 0x001a
        assert_eq!(&frame[8..], &[0x00, 0x1A]);
    }
}

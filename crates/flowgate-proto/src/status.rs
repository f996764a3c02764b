/*!
 * Valve status decoding.
 */
use serde::{Deserialize, Serialize};

/// Valve state reported in a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValveState {
    /// The device regulates flow towards the programmed set-point.
    Control,
    /// The valve is fully open.
    Opened,
    /// The valve is fully shut.
    Closed,
}

impl ValveState {
    /// Decode from bits 2-3 of status data byte 1.
    ///
    /// `bit2=0,bit3=0` is control mode, `bit2=1,bit3=0` opened and
    /// `bit2=0,bit3=1` closed. Both bits set is unreachable on real
    /// hardware and falls back to opened.
    pub fn from_status_byte(byte: u8) -> Self {
        match (byte >> 2) & 0b11 {
            0b00 => ValveState::Control,
            0b01 => ValveState::Opened,
            0b10 => ValveState::Closed,
            _ => ValveState::Opened,
        }
    }

    /// Lower-case state name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValveState::Control => "control",
            ValveState::Opened => "opened",
            ValveState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ValveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_table_matches_device_manual() {
        // bits 2-3 of the status byte, low bit first
        assert_eq!(ValveState::from_status_byte(0b0000_0000), ValveState::Control);
        assert_eq!(ValveState::from_status_byte(0b0000_0100), ValveState::Opened);
        assert_eq!(ValveState::from_status_byte(0b0000_1000), ValveState::Closed);
        assert_eq!(ValveState::from_status_byte(0b0000_1100), ValveState::Opened);
    }

    #[test]
    fn other_status_bits_are_ignored() {
        assert_eq!(ValveState::from_status_byte(0b1111_0011), ValveState::Control);
        assert_eq!(ValveState::from_status_byte(0b0101_0110), ValveState::Opened);
    }
}

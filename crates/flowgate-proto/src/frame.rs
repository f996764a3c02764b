/*!
 * Frame encoding and decoding.
 *
 * Every exchange with the device is one 10-byte frame in each direction:
 * 8 data bytes followed by a big-endian 16-bit sum of those bytes. The
 * checksum is always derived, never set independently.
 */
use crate::error::FrameError;
use crate::flow;
use crate::status::ValveState;

/// Number of data bytes in a frame, before the checksum trailer.
pub const DATA_LEN: usize = 8;

/// Total frame length on the wire, checksum included.
pub const FRAME_LEN: usize = 10;

/// Compute the frame checksum: the 16-bit sum of the 8 data bytes.
pub fn checksum(data: &[u8; DATA_LEN]) -> u16 {
    data.iter().map(|&b| u16::from(b)).sum()
}

/// Append the big-endian checksum to 8 data bytes, producing the wire frame.
pub fn encode(data: [u8; DATA_LEN]) -> [u8; FRAME_LEN] {
    let sum = checksum(&data).to_be_bytes();
    let mut frame = [0u8; FRAME_LEN];
    frame[..DATA_LEN].copy_from_slice(&data);
    frame[DATA_LEN] = sum[0];
    frame[DATA_LEN + 1] = sum[1];
    frame
}

/// A checksum-validated response frame.
///
/// Construction goes through [`ResponseFrame::decode`] only, so holding a
/// `ResponseFrame` is proof the trailer matched. Field accessors interpret
/// the data bytes per command semantics; which accessor is meaningful
/// depends on the command that elicited the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    data: [u8; DATA_LEN],
}

impl ResponseFrame {
    /// Validate a raw 10-byte response.
    ///
    /// Returns [`FrameError::Truncated`] when fewer or more than 10 bytes
    /// are given and [`FrameError::Checksum`] (raw bytes attached) when the
    /// trailer does not equal the big-endian sum of the first 8 bytes.
    /// A corrupt frame is never interpreted further.
    pub fn decode(raw: &[u8]) -> Result<Self, FrameError> {
        if raw.len() != FRAME_LEN {
            return Err(FrameError::Truncated(raw.len()));
        }
        let mut data = [0u8; DATA_LEN];
        data.copy_from_slice(&raw[..DATA_LEN]);

        let computed = checksum(&data);
        let received = u16::from_be_bytes([raw[DATA_LEN], raw[DATA_LEN + 1]]);
        if computed != received {
            return Err(FrameError::Checksum {
                computed,
                received,
                raw: raw.to_vec(),
            });
        }
        Ok(Self { data })
    }

    /// The 8 validated data bytes.
    pub fn data(&self) -> &[u8; DATA_LEN] {
        &self.data
    }

    /// Valve state from bits 2-3 of data byte 1 (status responses).
    pub fn valve_state(&self) -> ValveState {
        ValveState::from_status_byte(self.data[1])
    }

    /// Live flow reading from data bytes 2-3, in percent of full scale
    /// (flow responses). Sign-magnitude fixed point, two decimals.
    pub fn flow_percent(&self) -> f64 {
        flow::decode_flow(u16::from_be_bytes([self.data[2], self.data[3]]))
    }

    /// Confirmed set-point from data bytes 4-5, in percent (flow
    /// responses). This is the target echoed by the device, not the live
    /// reading.
    pub fn setpoint_percent(&self) -> f64 {
        flow::decode_setpoint(self.setpoint_raw())
    }

    /// Confirmed set-point in raw hundredths of a percent. Comparisons
    /// against a requested target belong on this grid; the device cannot
    /// resolve finer.
    pub fn setpoint_raw(&self) -> u16 {
        u16::from_be_bytes([self.data[4], self.data[5]])
    }

    /// Device serial number from data bytes 5-6 (handshake responses).
    pub fn serial_number(&self) -> u16 {
        u16::from_be_bytes([self.data[5], self.data[6]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_big_endian_sum() {
        let data = [0xFF, 0xFF, 0x01, 0, 0, 0, 0, 0];
        assert_eq!(checksum(&data), 0x01FF);
        let frame = encode(data);
        assert_eq!(&frame[8..], &[0x01, 0xFF]);
    }

    #[test]
    fn decode_accepts_valid_frame() {
        let frame = encode([0x11, 0x04, 0x12, 0x34, 0, 0, 0, 0x01]);
        let resp = ResponseFrame::decode(&frame).unwrap();
        assert_eq!(resp.data()[0], 0x11);
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let frame = encode([0x11, 0, 0, 0, 0, 0, 0, 0x01]);
        assert_eq!(
            ResponseFrame::decode(&frame[..6]),
            Err(FrameError::Truncated(6))
        );
    }

    #[test]
    fn decode_rejects_corrupt_checksum() {
        let mut frame = encode([0x11, 0, 0, 0, 0, 0, 0, 0x01]);
        frame[9] ^= 0x01;
        match ResponseFrame::decode(&frame) {
            Err(FrameError::Checksum { raw, .. }) => assert_eq!(raw, frame.to_vec()),
            other => panic!("expected checksum error, got {:?}", other),
        }
    }

    #[test]
    fn any_single_data_bit_flip_is_detected() {
        // A flip in the data bytes changes the sum; a flip in the trailer
        // changes the received value. Either way the comparison fails.
        let frame = encode([0x19, 0x04, 0xAB, 0xCD, 0x55, 0x07, 0xD0, 0x01]);
        for byte in 0..FRAME_LEN {
            for bit in 0..8 {
                let mut corrupt = frame;
                corrupt[byte] ^= 1 << bit;
                assert!(
                    ResponseFrame::decode(&corrupt).is_err(),
                    "flip of byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }
}

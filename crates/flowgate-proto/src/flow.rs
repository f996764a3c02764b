/*!
 * Fixed-point flow encoding.
 *
 * Flow values travel as 16-bit integers holding hundredths of a percent of
 * full-scale flow. Live readings are sign-magnitude: bit 15 flags a
 * negative reading, bits 0-14 carry the magnitude. Set-points are plain
 * unsigned values.
 */
use thiserror::Error;

/// Decode a live flow reading, in percent. Sign-magnitude, two decimals.
pub fn decode_flow(raw: u16) -> f64 {
    let magnitude = f64::from(raw & 0x7FFF) / 100.0;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a confirmed set-point, in percent. Unsigned, two decimals.
pub fn decode_setpoint(raw: u16) -> f64 {
    f64::from(raw) / 100.0
}

/// Error indicating a flow target outside the programmable range
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("flow target must be between 0 and 100 percent, got {0}")]
pub struct FlowOutOfRange(pub f64);

/// A validated flow target in [0, 100] percent of full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSetpoint {
    raw: u16,
}

impl FlowSetpoint {
    /// Validate a percentage and convert to the wire representation
    /// (hundredths of a percent, rounded).
    pub fn new(percent: f64) -> Result<Self, FlowOutOfRange> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(FlowOutOfRange(percent));
        }
        Ok(Self {
            raw: (percent * 100.0).round() as u16,
        })
    }

    /// Wire value: hundredths of a percent, big-endian on the wire.
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// The target as a percentage.
    pub fn percent(&self) -> f64 {
        f64::from(self.raw) / 100.0
    }
}

impl TryFrom<f64> for FlowSetpoint {
    type Error = FlowOutOfRange;

    fn try_from(percent: f64) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

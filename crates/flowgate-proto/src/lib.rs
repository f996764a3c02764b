/*!
 * Flowgate Protocol
 *
 * This crate implements the wire protocol spoken by Flowgate-compatible
 * mass-flow-control devices: fixed 10-byte frames (8 data bytes plus a
 * big-endian 16-bit sum checksum), the command set, and the bit-level
 * decoding of valve status, flow readings and set-points.
 *
 * The crate is pure: it performs no I/O and holds no state. Transport and
 * session handling live in `flowgate-driver`.
 */

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod flow;
pub mod frame;
pub mod status;

pub use command::Command;
pub use error::{FrameError, Result};
pub use flow::{FlowOutOfRange, FlowSetpoint};
pub use frame::{ResponseFrame, DATA_LEN, FRAME_LEN};
pub use status::ValveState;

/// Flowgate protocol crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

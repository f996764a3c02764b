/*!
 * Flow reading and set-point programming.
 */
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use flowgate_proto::{Command, FlowSetpoint, ValveState};

use crate::error::Result;
use crate::session::DeviceSession;

/// Outcome of a set-flow operation.
///
/// Only transport, checksum and timeout failures are errors; a device that
/// is simply not in the right mode, or that confirms a different target, is
/// a normal non-fatal outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetFlowOutcome {
    /// The device confirmed the requested target.
    Applied,
    /// The valve is not in control mode; no set command was issued.
    NotInControlMode {
        /// The state the device reported instead.
        state: ValveState,
    },
    /// The set command went out, but the read-back disagreed with the
    /// request by 0.05 percent or more.
    Rejected {
        /// The set-point the device reported.
        reported: f64,
    },
}

impl SetFlowOutcome {
    /// Boolean view of the outcome, matching the plain success flag the
    /// original control surface consumed.
    pub fn applied(&self) -> bool {
        matches!(self, SetFlowOutcome::Applied)
    }
}

/// Encodes flow targets and runs the set-flow and read-flow exchanges.
#[derive(Debug, Clone)]
pub struct FlowController {
    session: Arc<DeviceSession>,
}

impl FlowController {
    /// Create a controller on top of an established session.
    pub fn new(session: Arc<DeviceSession>) -> Self {
        Self { session }
    }

    /// Program a new flow target, in percent of full scale.
    ///
    /// Three exchanges under one lock acquisition: a status query (the
    /// valve must be in control mode), the set command, and a read-back of
    /// the confirmed set-point. Success requires the read-back to agree
    /// with the request within 0.05 percent. A failed step is never rolled
    /// back; commands already sent stay sent.
    pub async fn set_flow(&self, percent: f64) -> Result<SetFlowOutcome> {
        let target = FlowSetpoint::new(percent)?;

        let mut io = self.session.lock().await;

        let status = io.exchange(&Command::GetStatus).await?;
        let state = status.valve_state();
        if state != ValveState::Control {
            info!(%state, "cannot set flow: valve not in control mode");
            return Ok(SetFlowOutcome::NotInControlMode { state });
        }

        io.exchange(&Command::SetFlow(target)).await?;

        let readback = io.exchange(&Command::GetFlow).await?;
        let reported = readback.setpoint_percent();
        // Tolerance of 0.05 percent, compared in the wire's own hundredths
        // so a difference of exactly 0.05 fails regardless of float rounding.
        let deviation = i32::from(target.raw()).abs_diff(i32::from(readback.setpoint_raw()));
        if deviation < 5 {
            debug!(requested = percent, reported, "flow target confirmed");
            Ok(SetFlowOutcome::Applied)
        } else {
            warn!(
                requested = percent,
                reported, "device confirmed a different set-point"
            );
            Ok(SetFlowOutcome::Rejected { reported })
        }
    }

    /// Read the live flow, in percent of full scale.
    ///
    /// This is the unattended poll path: a corrupt or missing response
    /// yields NaN instead of an error so the next interval still runs.
    /// Transport failures still propagate since the session is done for.
    pub async fn read_flow(&self) -> Result<f64> {
        let mut io = self.session.lock().await;
        match io.exchange(&Command::GetFlow).await {
            Ok(response) => Ok(response.flow_percent()),
            Err(e) if e.is_exchange_error() => {
                error!(error = %e, "flow read failed, reporting NaN");
                Ok(f64::NAN)
            }
            Err(e) => Err(e),
        }
    }
}

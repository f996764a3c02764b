/*!
 * Background flow polling.
 *
 * An interval task reads the live flow on a fixed period and fans the
 * result out on a broadcast channel. The poll takes the same session lock
 * as user commands, so a multi-step operation in progress simply delays
 * the tick; delayed ticks slip rather than burst, keeping delivery at one
 * value per interval.
 */
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::flow::FlowController;

/// One published flow sample.
///
/// `percent` is NaN when the underlying read failed; polling continues on
/// the next interval regardless.
#[derive(Debug, Clone, Serialize)]
pub struct FlowUpdate {
    /// Serial number of the reporting device.
    pub serial: String,
    /// Live flow in percent of full scale, or NaN on a failed read.
    pub percent: f64,
    /// When the sample was taken.
    pub at: DateTime<Utc>,
}

/// Periodic flow poll with broadcast fan-out.
#[derive(Debug)]
pub struct PollingScheduler {
    flow: FlowController,
    serial: String,
    period: Duration,
    updates: broadcast::Sender<FlowUpdate>,
    stop: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PollingScheduler {
    /// Create a scheduler; it stays idle until [`start`](Self::start).
    pub fn new(flow: FlowController, serial: String, period: Duration, capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity);
        let (stop, _) = watch::channel(false);
        Self {
            flow,
            serial,
            period,
            updates,
            stop,
            worker: Mutex::new(None),
        }
    }

    /// Subscribe to flow updates. Delivery is best effort: a receiver that
    /// falls behind the channel capacity loses the oldest samples and sees
    /// `RecvError::Lagged`. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowUpdate> {
        self.updates.subscribe()
    }

    /// Start the interval task. Idempotent; a second call is a no-op.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap();
        if worker.is_some() {
            return;
        }

        let flow = self.flow.clone();
        let serial = self.serial.clone();
        let period = self.period;
        let updates = self.updates.clone();
        let mut stopped = self.stop.subscribe();

        debug!(serial = %serial, period_ms = period.as_millis() as u64, "starting flow poll");
        *worker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick of a tokio interval fires immediately; skip it
            // so the first sample lands one period after start
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.changed() => break,
                }

                // Once the tick fired, the read runs to completion; stop()
                // never aborts an exchange already in flight.
                let percent = match flow.read_flow().await {
                    Ok(percent) => percent,
                    Err(e) => {
                        warn!(serial = %serial, error = %e, "poll read failed");
                        f64::NAN
                    }
                };
                let update = FlowUpdate {
                    serial: serial.clone(),
                    percent,
                    at: Utc::now(),
                };
                trace!(serial = %update.serial, percent = update.percent, "publishing flow update");
                let _ = updates.send(update);
            }
            debug!(serial = %serial, "flow poll stopped");
        }));
    }

    /// Stop the interval task, waiting for an in-flight read to finish.
    pub async fn stop(&self) {
        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            let _ = self.stop.send(true);
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::session::DeviceSession;
    use crate::transport::MockTransport;
    use std::sync::Arc;
    use flowgate_proto::frame;

    fn flow_response(live: u16) -> Vec<u8> {
        frame::encode([0x11, 0, (live >> 8) as u8, live as u8, 0, 0, 0, 0x01]).to_vec()
    }

    fn scheduler(transport: MockTransport, period_ms: u64) -> PollingScheduler {
        let config = DriverConfig {
            response_wait_ms: 50,
            probe_interval_ms: 1,
            ..DriverConfig::default()
        };
        let session = Arc::new(DeviceSession::new(Box::new(transport), "COM1", config));
        PollingScheduler::new(
            FlowController::new(session),
            "2000".to_string(),
            Duration::from_millis(period_ms),
            16,
        )
    }

    #[tokio::test]
    async fn publishes_one_update_per_interval() {
        let (transport, handle) = MockTransport::new();
        handle.set_responder(|frame| {
            assert_eq!(frame[0], 0x11);
            Some(flow_response(4210)) // 42.10%
        });

        let poller = scheduler(transport, 10);
        let mut rx = poller.subscribe();
        poller.start();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.serial, "2000");
        assert_eq!(first.percent, 42.1);
        assert!(second.at >= first.at);

        poller.stop().await;
    }

    #[tokio::test]
    async fn failed_read_publishes_nan_and_polling_continues() {
        let (transport, handle) = MockTransport::new();
        let mut corrupt_once = true;
        handle.set_responder(move |_| {
            if corrupt_once {
                corrupt_once = false;
                let mut reply = flow_response(100);
                reply[9] ^= 0xFF;
                Some(reply)
            } else {
                Some(flow_response(100))
            }
        });

        let poller = scheduler(transport, 10);
        let mut rx = poller.subscribe();
        poller.start();

        let first = rx.recv().await.unwrap();
        assert!(first.percent.is_nan());
        let second = rx.recv().await.unwrap();
        assert_eq!(second.percent, 1.0);

        poller.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_start_restarts_nothing_while_running() {
        let (transport, handle) = MockTransport::new();
        handle.set_responder(|_| Some(flow_response(0)));

        let poller = scheduler(transport, 10);
        poller.start();
        poller.start(); // no-op
        poller.stop().await;
        poller.stop().await; // no-op
    }
}

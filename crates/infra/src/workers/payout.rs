use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::economy::Economy;
use crate::payout::PayoutBuffer;

use super::WorkerHandle;

/// Periodically flushes a [`PayoutBuffer`] into the economy.
#[derive(Debug)]
pub struct PayoutWorker;

impl PayoutWorker {
    /// Spawn the flush loop. The first flush happens one `interval` after
    /// spawning.
    ///
    /// Shutdown does not flush; the engine flushes once more itself after
    /// stopping the worker.
    pub fn spawn(
        name: &'static str,
        buffer: Arc<PayoutBuffer>,
        economy: Arc<dyn Economy>,
        interval: Duration,
    ) -> std::io::Result<WorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            info!(
                worker = name,
                interval_ms = interval.as_millis() as u64,
                "payout worker started"
            );
            loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let report = buffer.flush(&*economy);
                        if report.failures > 0 {
                            debug!(worker = name, failures = report.failures, "flush had failures");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!(worker = name, "payout worker stopped");
        })?;

        Ok(WorkerHandle::new(name, shutdown_tx, join))
    }
}

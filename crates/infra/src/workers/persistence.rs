//! Periodic auto-save.
//!
//! Fail-stop: the first failed (or panicking) save cycle ends the worker for
//! good. Nothing retries until a reload spawns a new worker; shutdown still
//! attempts one final save.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::players::PlayerRegistry;
use crate::storage::Storage;

use super::WorkerHandle;

/// Cumulative auto-save statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveStats {
    pub cycles: u64,
    pub records_saved: u64,
    /// Set once a cycle fails; the worker is gone after that.
    pub stopped_on_error: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct PersistenceScheduler;

impl PersistenceScheduler {
    /// Spawn the save loop, or nothing when `interval` is zero.
    pub fn spawn(
        name: &'static str,
        players: Arc<PlayerRegistry>,
        storage: Arc<dyn Storage>,
        interval: Duration,
        stats: Arc<Mutex<SaveStats>>,
    ) -> std::io::Result<Option<WorkerHandle>> {
        if interval.is_zero() {
            info!(worker = name, "auto save disabled");
            return Ok(None);
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            info!(worker = name, interval_secs = interval.as_secs(), "auto save started");
            loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| players.save_all(&*storage)));
                let mut stats = stats.lock().unwrap_or_else(|e| e.into_inner());
                match outcome {
                    Ok(Ok(saved)) => {
                        stats.cycles += 1;
                        stats.records_saved += saved as u64;
                        stats.last_saved_at = Some(Utc::now());
                        debug!(worker = name, saved, "auto save cycle");
                    }
                    Ok(Err(err)) => {
                        stats.stopped_on_error = true;
                        error!(
                            worker = name,
                            error = %err,
                            "save cycle failed; stopping auto save"
                        );
                        break;
                    }
                    Err(_) => {
                        stats.stopped_on_error = true;
                        error!(worker = name, "save cycle panicked; stopping auto save");
                        break;
                    }
                }
            }
            info!(worker = name, "auto save stopped");
        })?;

        Ok(Some(WorkerHandle::new(name, shutdown_tx, join)))
    }
}

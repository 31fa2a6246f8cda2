//! Background workers.
//!
//! Each worker is a named thread that wakes on a fixed interval. Dropping or
//! sending on the shutdown channel wakes it immediately.

pub mod payout;
pub mod persistence;

use std::sync::mpsc;
use std::thread;

pub use payout::PayoutWorker;
pub use persistence::{PersistenceScheduler, SaveStats};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(
        name: &'static str,
        shutdown: mpsc::Sender<()>,
        join: thread::JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            shutdown,
            join: Some(join),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the worker thread has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            if j.join().is_err() {
                tracing::error!(worker = self.name, "worker thread panicked");
            }
        }
    }
}

//! Buffered currency payouts.
//!
//! Rewards are credited here from event threads and paid to the economy in
//! batches by the payout worker (`workers::payout`).
//!
//! ## Flush
//!
//! - The pending map is swapped for an empty one under the lock
//! - Payments are issued after the lock is released, one per player
//! - Credits arriving mid-flush land in the fresh map (next cycle)
//! - A payment that errors or panics is counted as lost; the rest of the
//!   batch is still paid

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, warn};

use jobcraft_core::{CreditSink, PlayerId};

use crate::economy::Economy;

/// Result of one flush.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlushReport {
    pub payments: usize,
    pub failures: usize,
    pub amount_paid: f64,
    pub amount_lost: f64,
}

/// Cumulative payout statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PayoutStats {
    pub flushes: u64,
    pub payments: u64,
    pub failures: u64,
    pub amount_paid: f64,
    pub amount_lost: f64,
    pub last_flush_at: Option<DateTime<Utc>>,
}

/// Pending per-player currency totals.
#[derive(Debug, Default)]
pub struct PayoutBuffer {
    pending: Mutex<HashMap<PlayerId, f64>>,
    stats: Mutex<PayoutStats>,
}

impl PayoutBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the player's pending total. Never blocks on I/O.
    pub fn credit(&self, player: PlayerId, amount: f64) {
        if !amount.is_finite() {
            warn!(player = %player, amount, "dropping non-finite credit");
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending.entry(player).or_insert(0.0) += amount;
    }

    /// Pending total for a player (0 when nothing is pending).
    pub fn pending(&self, player: PlayerId) -> f64 {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.get(&player).copied().unwrap_or(0.0)
    }

    pub fn pending_players(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Swap out every pending total, leaving an empty map behind.
    fn take_pending(&self) -> HashMap<PlayerId, f64> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *pending)
    }

    /// Pay every pending total to `economy`, one call per player.
    ///
    /// Failures, including a panicking economy, are logged and the amount is
    /// dropped; other players in the batch are still paid.
    pub fn flush(&self, economy: &dyn Economy) -> FlushReport {
        let batch = self.take_pending();
        let mut report = FlushReport::default();

        for (player, amount) in batch {
            if amount == 0.0 {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| economy.pay(player, amount))) {
                Ok(Ok(())) => {
                    report.payments += 1;
                    report.amount_paid += amount;
                }
                Ok(Err(err)) => {
                    warn!(player = %player, amount, error = %err, "payout failed; amount dropped");
                    report.failures += 1;
                    report.amount_lost += amount;
                }
                Err(_) => {
                    error!(player = %player, amount, "economy panicked; amount dropped");
                    report.failures += 1;
                    report.amount_lost += amount;
                }
            }
        }

        if report.payments + report.failures > 0 {
            debug!(
                payments = report.payments,
                failures = report.failures,
                paid = report.amount_paid,
                "payout flush"
            );
        }

        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.flushes += 1;
        stats.payments += report.payments as u64;
        stats.failures += report.failures as u64;
        stats.amount_paid += report.amount_paid;
        stats.amount_lost += report.amount_lost;
        stats.last_flush_at = Some(Utc::now());

        report
    }

    pub fn stats(&self) -> PayoutStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CreditSink for PayoutBuffer {
    fn credit(&self, player: PlayerId, amount: f64) {
        PayoutBuffer::credit(self, player, amount)
    }
}

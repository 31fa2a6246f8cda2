//! Population-wide slot accounting per job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use jobcraft_core::{JobCatalog, JobKey};

use crate::storage::{Storage, StorageError};

#[derive(Debug)]
struct SlotEntry {
    name: String,
    capacity: Option<u32>,
    taken: AtomicU32,
}

/// Slot usage of one job, as reported by `SlotLedger::usage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUsage {
    pub job: String,
    pub taken: u32,
    pub capacity: Option<u32>,
}

/// Counters of slots taken per job.
///
/// A counter, not a gatekeeper: `take_slot` trusts the caller to have checked
/// `capacity_available`; `try_take_slot` does both atomically. Counters never
/// go below zero. Unknown jobs are ignored.
#[derive(Debug, Default)]
pub struct SlotLedger {
    entries: RwLock<HashMap<JobKey, SlotEntry>>,
}

impl SlotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every counter with a fresh count from storage.
    ///
    /// Counts come from storage rather than online players, since most
    /// players are not loaded. On error the previous counters stay in place.
    pub fn rebuild(&self, catalog: &JobCatalog, storage: &dyn Storage) -> Result<(), StorageError> {
        let mut fresh = HashMap::with_capacity(catalog.len());
        for job in catalog.iter() {
            let taken = storage.slots_taken(job.name())?;
            if let Some(capacity) = job.max_slots() {
                if taken > capacity {
                    warn!(job = job.name(), taken, capacity, "more slots taken than available");
                }
            }
            fresh.insert(
                job.key().clone(),
                SlotEntry {
                    name: job.name().to_string(),
                    capacity: job.max_slots(),
                    taken: AtomicU32::new(taken),
                },
            );
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *entries = fresh;
        info!(jobs = entries.len(), "slot ledger rebuilt");
        Ok(())
    }

    fn with_entry<T>(&self, job: &str, f: impl FnOnce(&SlotEntry) -> T) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&JobKey::new(job));
        if entry.is_none() {
            debug!(job, "slot operation on unknown job ignored");
        }
        entry.map(f)
    }

    /// Count one more holder of `job`.
    pub fn take_slot(&self, job: &str) {
        self.with_entry(job, |e| {
            let _ = e
                .taken
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1));
        });
    }

    /// Take a slot only if one is free. Returns whether the slot was taken.
    pub fn try_take_slot(&self, job: &str) -> bool {
        self.with_entry(job, |e| {
            e.taken
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match e.capacity {
                    Some(cap) if n >= cap => None,
                    _ => n.checked_add(1),
                })
                .is_ok()
        })
        .unwrap_or(false)
    }

    /// Count one fewer holder of `job`. A counter at zero stays at zero.
    pub fn leave_slot(&self, job: &str) {
        self.with_entry(job, |e| {
            if e
                .taken
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                warn!(job = %e.name, "leave_slot on a job with no slots taken");
            }
        });
    }

    /// Slots currently taken; 0 for unknown jobs.
    pub fn used_slots(&self, job: &str) -> u32 {
        self.with_entry(job, |e| e.taken.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Whether another player may join `job`. False for unknown jobs.
    pub fn capacity_available(&self, job: &str) -> bool {
        self.with_entry(job, |e| match e.capacity {
            Some(cap) => e.taken.load(Ordering::SeqCst) < cap,
            None => true,
        })
        .unwrap_or(false)
    }

    /// Usage of every tracked job, sorted by name.
    pub fn usage(&self) -> Vec<SlotUsage> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut usage: Vec<_> = entries
            .values()
            .map(|e| SlotUsage {
                job: e.name.clone(),
                taken: e.taken.load(Ordering::SeqCst),
                capacity: e.capacity,
            })
            .collect();
        usage.sort_by(|a, b| a.job.cmp(&b.job));
        usage
    }
}

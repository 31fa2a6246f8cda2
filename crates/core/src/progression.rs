//! Per-player, per-job level and experience.

use std::sync::Arc;

use crate::job::JobDefinition;

/// Level transition produced by adding experience.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
}

/// A player's state within one job.
///
/// While below the job's maximum level, `experience` stays under the
/// threshold of the current level. At maximum level experience may keep
/// accumulating but never changes the level.
#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    job: Arc<JobDefinition>,
    level: u32,
    experience: f64,
}

impl Progression {
    /// Fresh progression for a newly joined job.
    pub fn new(job: Arc<JobDefinition>) -> Self {
        Self {
            job,
            level: 1,
            experience: 0.0,
        }
    }

    /// Progression restored from storage.
    ///
    /// The level is clamped into `1..=max_level` and negative or non-finite
    /// experience is reset to zero.
    pub fn restore(job: Arc<JobDefinition>, level: u32, experience: f64) -> Self {
        let mut level = level.max(1);
        if let Some(max) = job.max_level() {
            level = level.min(max);
        }
        let experience = if experience.is_finite() && experience > 0.0 {
            experience
        } else {
            0.0
        };
        Self {
            job,
            level,
            experience,
        }
    }

    pub fn job(&self) -> &Arc<JobDefinition> {
        &self.job
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn is_max_level(&self) -> bool {
        self.job.is_max_level(self.level)
    }

    /// Experience needed to leave the current level.
    pub fn threshold(&self, job_count: usize) -> f64 {
        self.job.threshold(self.level, job_count)
    }

    /// Point this progression at a reloaded definition of the same job.
    pub(crate) fn rebind(&mut self, job: Arc<JobDefinition>) {
        if let Some(max) = job.max_level() {
            self.level = self.level.min(max);
        }
        self.job = job;
    }

    /// Add experience and resolve any level-ups.
    ///
    /// Negative amounts count as zero. Leftover experience carries into the
    /// next level, so adding deltas one at a time lands on the same state as
    /// adding their sum once.
    pub fn add_experience(&mut self, amount: f64, job_count: usize) -> Option<LevelUp> {
        if amount.is_finite() && amount > 0.0 {
            self.experience += amount;
        }
        self.resolve_levels(job_count)
    }

    pub(crate) fn resolve_levels(&mut self, job_count: usize) -> Option<LevelUp> {
        let from = self.level;
        while !self.is_max_level() && self.level < u32::MAX {
            let threshold = self.threshold(job_count);
            if !(threshold.is_finite() && threshold > 0.0) || self.experience < threshold {
                break;
            }
            self.experience -= threshold;
            self.level += 1;
        }
        (self.level != from).then_some(LevelUp {
            from,
            to: self.level,
        })
    }
}

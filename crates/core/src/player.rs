//! Player records and their persisted snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{JobKey, PlayerId};
use crate::job::{JobCatalog, JobDefinition};
use crate::progression::{LevelUp, Progression};

/// A player and the jobs they hold, in join order.
///
/// The first progression is the player's primary job.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    id: PlayerId,
    progressions: Vec<Progression>,
}

impl PlayerRecord {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            progressions: Vec::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Number of jobs held.
    pub fn job_count(&self) -> usize {
        self.progressions.len()
    }

    pub fn progressions(&self) -> &[Progression] {
        &self.progressions
    }

    pub(crate) fn progressions_mut(&mut self) -> &mut [Progression] {
        &mut self.progressions
    }

    pub fn progression(&self, job: &str) -> Option<&Progression> {
        let key = JobKey::new(job);
        self.progressions.iter().find(|p| *p.job().key() == key)
    }

    pub fn holds(&self, job: &str) -> bool {
        self.progression(job).is_some()
    }

    /// Start a new job at level 1.
    ///
    /// `max_jobs` of `None` means no ceiling. Slot capacity is not checked
    /// here; that belongs to the slot ledger.
    pub fn join(
        &mut self,
        job: Arc<JobDefinition>,
        max_jobs: Option<usize>,
    ) -> DomainResult<&Progression> {
        if JobCatalog::is_none_job(job.name()) {
            return Err(DomainError::NoneJob);
        }
        if self.holds(job.name()) {
            return Err(DomainError::AlreadyHeld(job.name().to_string()));
        }
        if let Some(max) = max_jobs {
            if self.progressions.len() >= max {
                return Err(DomainError::JobLimitReached { max });
            }
        }
        self.progressions.push(Progression::new(job));
        Ok(&self.progressions[self.progressions.len() - 1])
    }

    /// Stop holding a job.
    ///
    /// Thresholds depend on the job count, so the remaining jobs are
    /// re-resolved and any level-ups this causes are returned.
    pub fn leave(&mut self, job: &str) -> DomainResult<Departure> {
        if JobCatalog::is_none_job(job) {
            return Err(DomainError::NoneJob);
        }
        let key = JobKey::new(job);
        let idx = self
            .progressions
            .iter()
            .position(|p| *p.job().key() == key)
            .ok_or_else(|| DomainError::NotHeld(job.to_string()))?;
        let left = self.progressions.remove(idx);

        let count = self.progressions.len();
        let level_ups = self
            .progressions
            .iter_mut()
            .filter_map(|p| {
                p.resolve_levels(count)
                    .map(|level_up| (p.job().name().to_string(), level_up))
            })
            .collect();
        Ok(Departure { left, level_ups })
    }

    /// Stop holding every job. Nothing remains to re-resolve.
    pub fn leave_all(&mut self) -> Vec<Progression> {
        std::mem::take(&mut self.progressions)
    }

    /// Rebind progressions to a reloaded catalog.
    ///
    /// Returns the names of jobs that no longer exist; their progressions are
    /// dropped.
    pub fn rebind(&mut self, catalog: &JobCatalog) -> Vec<String> {
        let mut dropped = Vec::new();
        self.progressions.retain_mut(|p| match catalog.get(p.job().name()) {
            Some(job) => {
                p.rebind(job.clone());
                true
            }
            None => {
                dropped.push(p.job().name().to_string());
                false
            }
        });
        let count = self.progressions.len();
        for p in &mut self.progressions {
            p.resolve_levels(count);
        }
        dropped
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: self.id,
            jobs: self
                .progressions
                .iter()
                .map(|p| ProgressionSnapshot {
                    job: p.job().name().to_string(),
                    level: p.level(),
                    experience: p.experience(),
                })
                .collect(),
        }
    }

    /// Rebuild a record from storage.
    ///
    /// Jobs missing from `catalog` and duplicate entries are skipped; their
    /// names are returned so the caller can log them.
    pub fn restore(snapshot: &PlayerSnapshot, catalog: &JobCatalog) -> (Self, Vec<String>) {
        let mut record = Self::new(snapshot.player_id);
        let mut skipped = Vec::new();
        for entry in &snapshot.jobs {
            match catalog.get(&entry.job) {
                Some(job) if !record.holds(job.name()) => record.progressions.push(
                    Progression::restore(job.clone(), entry.level, entry.experience),
                ),
                _ => skipped.push(entry.job.clone()),
            }
        }
        let count = record.progressions.len();
        for p in &mut record.progressions {
            p.resolve_levels(count);
        }
        (record, skipped)
    }
}

/// Result of leaving one job.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    /// Final state of the job that was left.
    pub left: Progression,
    /// Remaining jobs that leveled up because their thresholds dropped.
    pub level_ups: Vec<(String, LevelUp)>,
}

/// Persisted form of one progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub job: String,
    pub level: u32,
    pub experience: f64,
}

/// Persisted form of a player record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub jobs: Vec<ProgressionSnapshot>,
}

impl PlayerSnapshot {
    pub fn holds(&self, job: &str) -> bool {
        let key = JobKey::new(job);
        self.jobs.iter().any(|j| JobKey::new(&j.job) == key)
    }
}

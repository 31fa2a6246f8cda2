//! Job definitions and the catalog of configured jobs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{ActionInfo, ActionKind};
use crate::curve::{ActionReward, JobCountPenalty, LevelingCurve, RateCurve, Reward};
use crate::error::{DomainError, DomainResult};
use crate::id::JobKey;
use crate::title::TitleLadder;

/// Configured name of the sentinel job paid to players holding no job.
pub const NONE_JOB_NAME: &str = "None";

/// Immutable description of one job.
///
/// Shared by reference (`Arc`) between the catalog and every progression
/// that points at it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    name: String,
    key: JobKey,
    max_level: Option<u32>,
    max_slots: Option<u32>,
    rewards: HashMap<ActionKind, HashMap<String, ActionReward>>,
    rates: RateCurve,
    penalty: JobCountPenalty,
    leveling: LevelingCurve,
}

impl JobDefinition {
    pub fn builder(name: impl Into<String>) -> JobDefinitionBuilder {
        JobDefinitionBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    /// Highest reachable level; `None` means unbounded.
    pub fn max_level(&self) -> Option<u32> {
        self.max_level
    }

    /// Slot capacity; `None` means unbounded.
    pub fn max_slots(&self) -> Option<u32> {
        self.max_slots
    }

    pub fn leveling(&self) -> &LevelingCurve {
        &self.leveling
    }

    pub fn is_max_level(&self, level: u32) -> bool {
        self.max_level.is_some_and(|max| level >= max)
    }

    /// Experience needed to leave `level` while holding `job_count` jobs.
    pub fn threshold(&self, level: u32, job_count: usize) -> f64 {
        self.leveling.threshold(level, job_count)
    }

    fn base_reward(&self, action: &ActionInfo) -> Option<ActionReward> {
        let targets = self.rewards.get(&action.kind)?;
        if let Some(qualified) = action.qualified_key() {
            if let Some(reward) = targets.get(&qualified) {
                return Some(*reward);
            }
        }
        targets.get(&action.target_key()).copied()
    }

    /// Reward for `action` at `level` with `job_count` jobs held.
    ///
    /// `None` when this job does not pay for the action at all.
    pub fn reward_for(&self, action: &ActionInfo, level: u32, job_count: usize) -> Option<Reward> {
        let base = self.base_reward(action)?;
        let (income_rate, experience_rate) = self.rates.rates_at(level);
        Some(Reward {
            income: base.base_income * income_rate * self.penalty.income_factor(job_count),
            experience: base.base_experience
                * experience_rate
                * self.penalty.experience_factor(job_count),
        })
    }
}

/// Builder for `JobDefinition`.
#[derive(Debug, Clone)]
pub struct JobDefinitionBuilder {
    name: String,
    max_level: Option<u32>,
    max_slots: Option<u32>,
    rewards: HashMap<ActionKind, HashMap<String, ActionReward>>,
    rates: RateCurve,
    penalty: JobCountPenalty,
    leveling: LevelingCurve,
}

impl JobDefinitionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_level: None,
            max_slots: None,
            rewards: HashMap::new(),
            rates: RateCurve::flat(),
            penalty: JobCountPenalty::default(),
            leveling: LevelingCurve::default(),
        }
    }

    pub fn max_level(mut self, level: u32) -> Self {
        self.max_level = Some(level);
        self
    }

    pub fn max_slots(mut self, slots: u32) -> Self {
        self.max_slots = Some(slots);
        self
    }

    /// Pay `income`/`experience` for `kind` on `target` (`"stone"` or `"wool:red"`).
    pub fn reward(mut self, kind: ActionKind, target: &str, income: f64, experience: f64) -> Self {
        self.rewards
            .entry(kind)
            .or_default()
            .insert(target.trim().to_lowercase(), ActionReward::new(income, experience));
        self
    }

    pub fn rates(mut self, rates: RateCurve) -> Self {
        self.rates = rates;
        self
    }

    pub fn penalty(mut self, penalty: JobCountPenalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn leveling(mut self, leveling: LevelingCurve) -> Self {
        self.leveling = leveling;
        self
    }

    pub fn build(self) -> DomainResult<JobDefinition> {
        let key = JobKey::new(&self.name);
        if key.as_str().is_empty() {
            return Err(DomainError::validation("job name cannot be empty"));
        }
        if self.max_level == Some(0) {
            return Err(DomainError::validation(format!(
                "job {}: max level must be at least 1",
                self.name
            )));
        }
        for targets in self.rewards.values() {
            for (target, reward) in targets {
                if !reward.base_income.is_finite() || !reward.base_experience.is_finite() {
                    return Err(DomainError::validation(format!(
                        "job {}: reward for {target} is not finite",
                        self.name
                    )));
                }
            }
        }
        self.leveling.validate()?;

        Ok(JobDefinition {
            name: self.name.trim().to_string(),
            key,
            max_level: self.max_level,
            max_slots: self.max_slots,
            rewards: self.rewards,
            rates: self.rates,
            penalty: self.penalty,
            leveling: self.leveling,
        })
    }

    /// Build the sentinel job: flat income, no leveling, no slot limit.
    pub fn build_none(mut self) -> DomainResult<JobDefinition> {
        self.max_level = Some(1);
        self.max_slots = None;
        self.rates = RateCurve::flat();
        self.penalty = JobCountPenalty::default();
        self.build()
    }
}

/// The set of jobs loaded from configuration, plus the optional "none" job.
#[derive(Debug, Clone, Default)]
pub struct JobCatalog {
    jobs: Vec<Arc<JobDefinition>>,
    index: HashMap<JobKey, usize>,
    none: Option<Arc<JobDefinition>>,
    titles: TitleLadder,
}

impl JobCatalog {
    pub fn new(jobs: Vec<JobDefinition>, none: Option<JobDefinition>) -> DomainResult<Self> {
        let none_key = JobKey::new(NONE_JOB_NAME);
        let mut index = HashMap::with_capacity(jobs.len());
        let mut shared = Vec::with_capacity(jobs.len());

        for job in jobs {
            if *job.key() == none_key {
                return Err(DomainError::validation(format!(
                    "job name {} is reserved",
                    job.name()
                )));
            }
            if index.insert(job.key().clone(), shared.len()).is_some() {
                return Err(DomainError::validation(format!(
                    "job {} is defined twice",
                    job.name()
                )));
            }
            shared.push(Arc::new(job));
        }

        Ok(Self {
            jobs: shared,
            index,
            none: none.map(Arc::new),
            titles: TitleLadder::default(),
        })
    }

    /// Attach the level titles shared by every job.
    pub fn with_titles(mut self, titles: TitleLadder) -> Self {
        self.titles = titles;
        self
    }

    pub fn titles(&self) -> &TitleLadder {
        &self.titles
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&Arc<JobDefinition>> {
        self.index.get(&JobKey::new(name)).map(|i| &self.jobs[*i])
    }

    pub fn none_job(&self) -> Option<&Arc<JobDefinition>> {
        self.none.as_ref()
    }

    pub fn is_none_job(name: &str) -> bool {
        JobKey::new(name) == JobKey::new(NONE_JOB_NAME)
    }

    /// Jobs in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<JobDefinition>> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

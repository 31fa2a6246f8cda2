//! Reward and leveling curves.
//!
//! A job's payout for an action is `base × rate(level) × penalty(job_count)`:
//!
//! - `ActionReward` holds the base income/experience for one action target
//! - `RateCurve` interpolates level-dependent multipliers between ordered points
//! - `JobCountPenalty` dampens rewards for players holding several jobs
//!
//! `LevelingCurve` gives the experience needed to advance past a level.

use crate::error::{DomainError, DomainResult};

/// Base payout for one action target, before level and job-count scaling.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ActionReward {
    pub base_income: f64,
    pub base_experience: f64,
}

impl ActionReward {
    pub fn new(base_income: f64, base_experience: f64) -> Self {
        Self {
            base_income,
            base_experience,
        }
    }
}

/// Scaled reward for one action at a given level and job count.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Reward {
    pub income: f64,
    pub experience: f64,
}

impl Reward {
    pub fn scaled(self, multiplier: f64) -> Self {
        Self {
            income: self.income * multiplier,
            experience: self.experience * multiplier,
        }
    }
}

/// One control point of a `RateCurve`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CurvePoint {
    pub level: u32,
    pub income_rate: f64,
    pub experience_rate: f64,
}

impl CurvePoint {
    pub fn new(level: u32, income_rate: f64, experience_rate: f64) -> Self {
        Self {
            level,
            income_rate,
            experience_rate,
        }
    }
}

/// Level-dependent rate multipliers.
///
/// Points are ordered by level. Between two points the rates are linearly
/// interpolated; below the first and above the last point they are clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct RateCurve {
    points: Vec<CurvePoint>,
}

impl RateCurve {
    pub fn new(mut points: Vec<CurvePoint>) -> DomainResult<Self> {
        if points.is_empty() {
            return Err(DomainError::validation("rate curve needs at least one point"));
        }
        points.sort_by_key(|p| p.level);
        for pair in points.windows(2) {
            if pair[0].level == pair[1].level {
                return Err(DomainError::validation(format!(
                    "rate curve has two points for level {}",
                    pair[0].level
                )));
            }
        }
        if points
            .iter()
            .any(|p| !p.income_rate.is_finite() || !p.experience_rate.is_finite())
        {
            return Err(DomainError::validation("rate curve rates must be finite"));
        }
        Ok(Self { points })
    }

    /// Rates of 1.0 at every level.
    pub fn flat() -> Self {
        Self {
            points: vec![CurvePoint::new(1, 1.0, 1.0)],
        }
    }

    /// Linear growth from 1.0 at level 1, by `income_step`/`experience_step` per level.
    pub fn linear(income_step: f64, experience_step: f64, up_to_level: u32) -> DomainResult<Self> {
        let top = up_to_level.max(2);
        let span = f64::from(top - 1);
        Self::new(vec![
            CurvePoint::new(1, 1.0, 1.0),
            CurvePoint::new(top, 1.0 + income_step * span, 1.0 + experience_step * span),
        ])
    }

    /// `(income_rate, experience_rate)` in effect at `level`.
    pub fn rates_at(&self, level: u32) -> (f64, f64) {
        let first = self.points[0];
        if level <= first.level {
            return (first.income_rate, first.experience_rate);
        }
        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if level < hi.level {
                let t = f64::from(level - lo.level) / f64::from(hi.level - lo.level);
                return (
                    lo.income_rate + t * (hi.income_rate - lo.income_rate),
                    lo.experience_rate + t * (hi.experience_rate - lo.experience_rate),
                );
            }
        }
        let last = self.points[self.points.len() - 1];
        (last.income_rate, last.experience_rate)
    }
}

impl Default for RateCurve {
    fn default() -> Self {
        Self::flat()
    }
}

/// Reward reduction for players holding more than one job.
///
/// The first job is never penalised; each additional job removes the given
/// fraction, floored at zero.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct JobCountPenalty {
    pub income_per_extra_job: f64,
    pub experience_per_extra_job: f64,
}

impl JobCountPenalty {
    pub fn new(income_per_extra_job: f64, experience_per_extra_job: f64) -> Self {
        Self {
            income_per_extra_job,
            experience_per_extra_job,
        }
    }

    pub fn income_factor(&self, job_count: usize) -> f64 {
        factor(self.income_per_extra_job, job_count)
    }

    pub fn experience_factor(&self, job_count: usize) -> f64 {
        factor(self.experience_per_extra_job, job_count)
    }
}

fn factor(per_extra_job: f64, job_count: usize) -> f64 {
    if job_count <= 1 {
        return 1.0;
    }
    (1.0 - per_extra_job * (job_count - 1) as f64).max(0.0)
}

/// Experience required to advance from a level to the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelingCurve {
    /// `base × (growth + growth_per_extra_job × (jobs − 1))^(level − 1)`
    Exponential {
        base: f64,
        growth: f64,
        growth_per_extra_job: f64,
    },
    /// Explicit thresholds, index 0 = level 1. The last entry repeats.
    Table(Vec<f64>),
}

impl LevelingCurve {
    /// Same threshold at every level.
    pub fn constant(threshold: f64) -> Self {
        Self::Exponential {
            base: threshold,
            growth: 1.0,
            growth_per_extra_job: 0.0,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        match self {
            LevelingCurve::Exponential {
                base,
                growth,
                growth_per_extra_job,
            } => {
                if !(base.is_finite() && *base > 0.0) {
                    return Err(DomainError::validation("leveling base must be positive"));
                }
                if !(growth.is_finite() && *growth >= 1.0) {
                    return Err(DomainError::validation("leveling growth must be at least 1"));
                }
                if !(growth_per_extra_job.is_finite() && *growth_per_extra_job >= 0.0) {
                    return Err(DomainError::validation(
                        "leveling growth per extra job cannot be negative",
                    ));
                }
            }
            LevelingCurve::Table(thresholds) => {
                if thresholds.is_empty() {
                    return Err(DomainError::validation("leveling table is empty"));
                }
                if thresholds.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
                    return Err(DomainError::validation(
                        "leveling thresholds must be positive",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Experience needed to leave `level` (1-based) while holding `job_count` jobs.
    pub fn threshold(&self, level: u32, job_count: usize) -> f64 {
        let level = level.max(1);
        match self {
            LevelingCurve::Exponential {
                base,
                growth,
                growth_per_extra_job,
            } => {
                let extra = job_count.saturating_sub(1) as f64;
                let g = growth + growth_per_extra_job * extra;
                base * g.powf(f64::from(level - 1))
            }
            LevelingCurve::Table(thresholds) => {
                let idx = (level as usize - 1).min(thresholds.len().saturating_sub(1));
                thresholds.get(idx).copied().unwrap_or(f64::INFINITY)
            }
        }
    }
}

impl Default for LevelingCurve {
    fn default() -> Self {
        Self::Exponential {
            base: 100.0,
            growth: 1.13,
            growth_per_extra_job: 0.01,
        }
    }
}

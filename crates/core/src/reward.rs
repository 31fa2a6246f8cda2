//! Action-to-reward computation.

use crate::action::ActionInfo;
use crate::id::PlayerId;
use crate::job::JobDefinition;
use crate::player::PlayerRecord;
use crate::progression::LevelUp;

/// Destination for currency earned by actions.
///
/// Implementations must not block; the reward path runs on event threads.
pub trait CreditSink {
    fn credit(&self, player: PlayerId, amount: f64);
}

impl<T: CreditSink + ?Sized> CreditSink for &T {
    fn credit(&self, player: PlayerId, amount: f64) {
        (**self).credit(player, amount)
    }
}

impl<T: CreditSink + ?Sized> CreditSink for std::sync::Arc<T> {
    fn credit(&self, player: PlayerId, amount: f64) {
        (**self).credit(player, amount)
    }
}

/// What one job paid for one action.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardOutcome {
    pub job: String,
    /// Income after the multiplier.
    pub income: f64,
    /// Experience after the multiplier.
    pub experience: f64,
    /// Experience before the multiplier (mirrored to the host's own bar).
    pub base_experience: f64,
    pub level_up: Option<LevelUp>,
}

impl RewardOutcome {
    pub fn leveled_up(&self) -> bool {
        self.level_up.is_some()
    }
}

/// Stateless reward computation over a player record.
#[derive(Debug, Copy, Clone, Default)]
pub struct RewardComputer;

impl RewardComputer {
    /// Compute rewards for `action`, apply experience, and credit income.
    ///
    /// Players without a job are paid from `none_job` (level 1, job count 0)
    /// and never gain experience. Jobs that do not pay for the action are
    /// skipped. A non-finite or negative multiplier counts as 0.
    pub fn compute_and_apply(
        record: &mut PlayerRecord,
        none_job: Option<&JobDefinition>,
        action: &ActionInfo,
        multiplier: f64,
        sink: &dyn CreditSink,
    ) -> Vec<RewardOutcome> {
        let multiplier = if multiplier.is_finite() {
            multiplier.max(0.0)
        } else {
            0.0
        };
        let player = record.id();
        let job_count = record.job_count();

        if job_count == 0 {
            let Some(none) = none_job else {
                return Vec::new();
            };
            let Some(reward) = none.reward_for(action, 1, 0) else {
                return Vec::new();
            };
            let income = reward.income * multiplier;
            if income != 0.0 {
                sink.credit(player, income);
            }
            return vec![RewardOutcome {
                job: none.name().to_string(),
                income,
                experience: 0.0,
                base_experience: 0.0,
                level_up: None,
            }];
        }

        let mut outcomes = Vec::new();
        for prog in record.progressions_mut() {
            let Some(reward) = prog.job().reward_for(action, prog.level(), job_count) else {
                continue;
            };
            let scaled = reward.scaled(multiplier);
            if scaled.income != 0.0 {
                sink.credit(player, scaled.income);
            }
            let level_up = prog.add_experience(scaled.experience, job_count);
            outcomes.push(RewardOutcome {
                job: prog.job().name().to_string(),
                income: scaled.income,
                experience: scaled.experience,
                base_experience: reward.experience,
                level_up,
            });
        }
        outcomes
    }
}

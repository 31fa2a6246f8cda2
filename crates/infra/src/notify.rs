//! Notification and environment collaborators.
//!
//! Rendering chat messages, syncing experience bars and checking restricted
//! regions all happen in the host; the engine only reports to these traits.

use tracing::info;

use jobcraft_core::{LevelUp, PlayerId, Title};

/// Receives progression events to render to players. Pure sink.
pub trait Notifier: Send + Sync {
    /// A job paid out for an action.
    fn rewarded(&self, _player: PlayerId, _job: &str, _income: f64, _experience: f64) {}

    /// A job gained one or more levels. `new_title` is set when the new
    /// level earns a different title than the old one.
    fn leveled_up(
        &self,
        _player: PlayerId,
        _job: &str,
        _level_up: LevelUp,
        _new_title: Option<&Title>,
    ) {
    }

    /// Raw job experience to mirror into the host's own experience bar.
    fn experience_gained(&self, _player: PlayerId, _amount: f64) {}
}

/// Ignores every event.
#[derive(Debug, Copy, Clone, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {}

/// Logs every event through `tracing`.
#[derive(Debug, Copy, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn rewarded(&self, player: PlayerId, job: &str, income: f64, experience: f64) {
        tracing::debug!(player = %player, job, income, experience, "rewarded");
    }

    fn leveled_up(
        &self,
        player: PlayerId,
        job: &str,
        level_up: LevelUp,
        new_title: Option<&Title>,
    ) {
        info!(
            player = %player,
            job,
            from = level_up.from,
            to = level_up.to,
            title = new_title.map(Title::name),
            "level up"
        );
    }

    fn experience_gained(&self, player: PlayerId, amount: f64) {
        tracing::trace!(player = %player, amount, "mirrored experience");
    }
}

/// Environmental reward multiplier for a player (e.g. 0.0 inside a
/// restricted area).
pub trait MultiplierSource: Send + Sync {
    fn multiplier(&self, player: PlayerId) -> f64;
}

/// Same multiplier for everyone.
#[derive(Debug, Copy, Clone)]
pub struct ConstantMultiplier(pub f64);

impl Default for ConstantMultiplier {
    fn default() -> Self {
        Self(1.0)
    }
}

impl MultiplierSource for ConstantMultiplier {
    fn multiplier(&self, _player: PlayerId) -> f64 {
        self.0
    }
}

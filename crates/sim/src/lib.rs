//! Simulated server session driving the jobs engine.
//!
//! Players join, pick jobs, and perform a deterministic stream of actions;
//! the run ends with a summary of what the engine paid and saved.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use jobcraft_core::{
    ActionInfo, ActionKind, DomainError, DomainResult, JobCatalog, JobCountPenalty, JobDefinition,
    LevelingCurve, PlayerId, RateCurve, Title, TitleLadder, NONE_JOB_NAME,
};
use jobcraft_infra::{EngineError, JobsEngine, PayoutStats, SaveStats, SlotUsage};

/// The built-in job set used by the simulator.
pub fn demo_catalog() -> DomainResult<JobCatalog> {
    let miner = JobDefinition::builder("Miner")
        .max_level(50)
        .max_slots(4)
        .rates(RateCurve::linear(0.02, 0.01, 50)?)
        .penalty(JobCountPenalty::new(0.15, 0.1))
        .reward(ActionKind::Break, "stone", 0.5, 1.0)
        .reward(ActionKind::Break, "iron_ore", 3.0, 8.0)
        .reward(ActionKind::Break, "diamond_ore", 25.0, 40.0)
        .reward(ActionKind::Smelt, "iron_ingot", 1.0, 2.0)
        .build()?;
    let farmer = JobDefinition::builder("Farmer")
        .max_level(50)
        .rates(RateCurve::linear(0.01, 0.01, 50)?)
        .penalty(JobCountPenalty::new(0.15, 0.1))
        .reward(ActionKind::Break, "wheat", 0.4, 1.5)
        .reward(ActionKind::Place, "wheat_seeds", 0.1, 0.5)
        .reward(ActionKind::Breed, "cow", 2.0, 6.0)
        .reward(ActionKind::Milk, "cow", 0.5, 1.0)
        .build()?;
    let hunter = JobDefinition::builder("Hunter")
        .max_level(50)
        .penalty(JobCountPenalty::new(0.15, 0.1))
        .leveling(LevelingCurve::Exponential {
            base: 80.0,
            growth: 1.15,
            growth_per_extra_job: 0.02,
        })
        .reward(ActionKind::Kill, "zombie", 2.0, 10.0)
        .reward(ActionKind::Kill, "skeleton", 2.5, 12.0)
        .reward(ActionKind::Kill, "creeper", -1.0, 15.0)
        .build()?;
    let fisher = JobDefinition::builder("Fisherman")
        .max_level(30)
        .max_slots(2)
        .reward(ActionKind::Fish, "cod", 1.0, 4.0)
        .reward(ActionKind::Fish, "salmon", 1.5, 5.0)
        .build()?;
    let none = JobDefinition::builder(NONE_JOB_NAME)
        .reward(ActionKind::Break, "stone", 0.05, 0.0)
        .reward(ActionKind::Kill, "zombie", 0.2, 0.0)
        .build_none()?;

    let titles = TitleLadder::new(vec![
        Title::new("Novice", "N", 0)?,
        Title::new("Apprentice", "A", 10)?,
        Title::new("Journeyman", "J", 25)?,
        Title::new("Master", "M", 45)?,
    ]);

    Ok(JobCatalog::new(vec![miner, farmer, hunter, fisher], Some(none))?.with_titles(titles))
}

/// Knobs for one simulated session.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub players: usize,
    pub rounds: usize,
    /// Pause between rounds, letting the workers tick.
    pub round_delay: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            players: 8,
            rounds: 200,
            round_delay: Duration::from_millis(5),
        }
    }
}

/// What a finished session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub players: usize,
    pub actions: u64,
    pub level_ups: u64,
    pub rejected_joins: u64,
    pub slots: Vec<(String, u32, Option<u32>)>,
    pub payouts: PayoutStats,
    pub saves: SaveStats,
}

const JOB_PREFERENCES: [&[&str]; 4] = [
    &["Miner", "Farmer"],
    &["Hunter"],
    &["Fisherman", "Miner"],
    &[],
];

const ACTIONS: [(ActionKind, &str); 10] = [
    (ActionKind::Break, "stone"),
    (ActionKind::Break, "iron_ore"),
    (ActionKind::Break, "diamond_ore"),
    (ActionKind::Smelt, "iron_ingot"),
    (ActionKind::Break, "wheat"),
    (ActionKind::Breed, "cow"),
    (ActionKind::Kill, "zombie"),
    (ActionKind::Kill, "creeper"),
    (ActionKind::Fish, "salmon"),
    (ActionKind::Craft, "torch"),
];

/// Run one session against a started engine and return its summary.
///
/// The engine is left running; the caller owns shutdown.
pub fn run_simulation(
    engine: &JobsEngine,
    settings: &SimulationSettings,
) -> Result<SimulationSummary, EngineError> {
    let players: Vec<PlayerId> = (0..settings.players).map(|_| PlayerId::new()).collect();
    let mut rejected_joins = 0u64;

    for (i, &player) in players.iter().enumerate() {
        engine.player_join(player)?;
        for job in JOB_PREFERENCES[i % JOB_PREFERENCES.len()] {
            match engine.join_job(player, job) {
                Ok(()) => {}
                Err(EngineError::Domain(
                    err @ (DomainError::NoFreeSlots(_)
                    | DomainError::JobLimitReached { .. }
                    | DomainError::AlreadyHeld(_)),
                )) => {
                    debug!(player = %player, job, error = %err, "join rejected");
                    rejected_joins += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    let mut actions = 0u64;
    let mut level_ups = 0u64;
    for round in 0..settings.rounds {
        for (i, &player) in players.iter().enumerate() {
            let (kind, target) = ACTIONS[(round * 7 + i * 3) % ACTIONS.len()];
            let outcomes = engine.perform_action(player, &ActionInfo::new(kind, target))?;
            actions += 1;
            level_ups += outcomes.iter().filter(|o| o.leveled_up()).count() as u64;
        }
        if !settings.round_delay.is_zero() {
            std::thread::sleep(settings.round_delay);
        }
    }

    // One player drops out mid-session and their slots are released.
    if let Some(&quitter) = players.first() {
        let left = engine.leave_all_jobs(quitter)?;
        info!(player = %quitter, jobs = ?left, "player left all jobs");
        engine.player_quit(quitter)?;
    }

    let slots = engine
        .slot_usage()
        .into_iter()
        .map(|SlotUsage { job, taken, capacity }| (job, taken, capacity))
        .collect();

    Ok(SimulationSummary {
        players: players.len(),
        actions,
        level_ups,
        rejected_joins,
        slots,
        payouts: engine.payout_stats(),
        saves: engine.save_stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use jobcraft_infra::{EngineConfig, InMemoryEconomy, InMemoryStorage, StaticConfig};

    #[test]
    fn demo_catalog_is_valid() {
        let catalog = demo_catalog().unwrap();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.none_job().is_some());
        assert_eq!(catalog.get("fisherman").unwrap().max_slots(), Some(2));
        assert_eq!(catalog.titles().title_for(30).unwrap().name(), "Journeyman");
    }

    #[test]
    fn short_session_pays_and_saves() {
        let storage = Arc::new(InMemoryStorage::new());
        let economy = Arc::new(InMemoryEconomy::new());
        let config = EngineConfig::default()
            .with_intervals(Duration::from_millis(20), Duration::from_millis(10));
        let engine = JobsEngine::new(
            Arc::new(StaticConfig::new(config, demo_catalog().unwrap())),
            storage.clone(),
            economy.clone(),
        );
        engine.startup(&[]).unwrap();

        let settings = SimulationSettings {
            players: 6,
            rounds: 20,
            round_delay: Duration::ZERO,
        };
        let summary = run_simulation(&engine, &settings).unwrap();
        engine.shutdown().unwrap();

        assert_eq!(summary.actions, 120);
        assert!(summary.slots.iter().all(|(_, taken, cap)| cap.is_none_or(|c| *taken <= c)));
        assert!(economy.total_paid() > 0.0);
        // The quitter was saved on disconnect; everyone else at shutdown.
        assert_eq!(storage.len(), 6);
    }
}

//! The engine context: one owned value wiring the catalog, slot ledger,
//! player registry, payout buffer, workers and external collaborators.
//!
//! ## Lifecycle
//!
//! - `startup`: reload, then bring the given players online
//! - `reload`: re-read configuration, rebuild slot counts from storage, rebind
//!   online records, restart both workers
//! - `shutdown`: stop workers, flush payouts, save everyone, close storage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tracing::{error, info, warn};

use jobcraft_core::{
    ActionInfo, DomainError, JobCatalog, LevelUp, PlayerId, RewardComputer, RewardOutcome,
};

use crate::config::{ConfigSource, EngineConfig};
use crate::economy::Economy;
use crate::notify::{ConstantMultiplier, MultiplierSource, Notifier, NullNotifier};
use crate::payout::{FlushReport, PayoutBuffer, PayoutStats};
use crate::players::{PlayerRegistry, SharedRecord};
use crate::slots::{SlotLedger, SlotUsage};
use crate::storage::{Storage, StorageError};
use crate::workers::{PayoutWorker, PersistenceScheduler, SaveStats, WorkerHandle};

const PAYOUT_WORKER: &str = "jobcraft-payout";
const SAVE_WORKER: &str = "jobcraft-autosave";

/// Engine-level error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("player {0} is not online")]
    PlayerNotOnline(PlayerId),

    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("engine is shut down")]
    ShutDown,
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
struct EngineState {
    config: EngineConfig,
    catalog: Arc<JobCatalog>,
}

#[derive(Debug, Default)]
struct Workers {
    payout: Option<WorkerHandle>,
    persistence: Option<WorkerHandle>,
}

impl Workers {
    fn stop(&mut self) {
        if let Some(w) = self.payout.take() {
            w.shutdown();
        }
        if let Some(w) = self.persistence.take() {
            w.shutdown();
        }
    }
}

pub struct JobsEngine {
    config_source: Arc<dyn ConfigSource>,
    state: RwLock<EngineState>,
    slots: SlotLedger,
    players: Arc<PlayerRegistry>,
    payouts: Arc<PayoutBuffer>,
    storage: Arc<dyn Storage>,
    economy: Arc<dyn Economy>,
    notifier: Arc<dyn Notifier>,
    multiplier: Arc<dyn MultiplierSource>,
    save_stats: Arc<Mutex<SaveStats>>,
    // Also serializes reload against shutdown.
    workers: Mutex<Workers>,
    shut_down: AtomicBool,
}

impl JobsEngine {
    /// Build an idle engine. Nothing runs until `startup` or `reload`.
    pub fn new(
        config_source: Arc<dyn ConfigSource>,
        storage: Arc<dyn Storage>,
        economy: Arc<dyn Economy>,
    ) -> Self {
        Self {
            config_source,
            state: RwLock::new(EngineState {
                config: EngineConfig::default(),
                catalog: Arc::new(JobCatalog::default()),
            }),
            slots: SlotLedger::new(),
            players: Arc::new(PlayerRegistry::new()),
            payouts: Arc::new(PayoutBuffer::new()),
            storage,
            economy,
            notifier: Arc::new(NullNotifier),
            multiplier: Arc::new(ConstantMultiplier::default()),
            save_stats: Arc::default(),
            workers: Mutex::new(Workers::default()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_multiplier(mut self, multiplier: Arc<dyn MultiplierSource>) -> Self {
        self.multiplier = multiplier;
        self
    }

    fn ensure_running(&self) -> EngineResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShutDown);
        }
        Ok(())
    }

    fn online(&self, player: PlayerId) -> EngineResult<SharedRecord> {
        self.players
            .get(player)
            .ok_or(EngineError::PlayerNotOnline(player))
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Load configuration, start the workers, and bring `online` players in.
    pub fn startup(&self, online: &[PlayerId]) -> EngineResult<()> {
        self.reload()?;
        for &player in online {
            self.player_join(player)?;
        }
        info!(players = online.len(), "jobs engine started");
        Ok(())
    }

    /// Re-read configuration and restart the workers.
    ///
    /// If slot counts cannot be rebuilt the previous configuration, catalog
    /// and workers stay in place.
    pub fn reload(&self) -> EngineResult<()> {
        self.ensure_running()?;
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        // Re-check under the lock: shutdown may have won the race.
        self.ensure_running()?;

        let (config, catalog) = self.config_source.load();
        let config = config.validated();
        let catalog = Arc::new(catalog);

        if let Err(err) = self.slots.rebuild(&catalog, &*self.storage) {
            error!(error = %err, "reload aborted: could not count job slots");
            return Err(err.into());
        }

        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.config = config.clone();
            state.catalog = catalog.clone();
        }
        self.players.rebind(&catalog);

        workers.stop();
        workers.payout = Some(PayoutWorker::spawn(
            PAYOUT_WORKER,
            self.payouts.clone(),
            self.economy.clone(),
            config.payout_interval(),
        )?);
        self.save_stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stopped_on_error = false;
        workers.persistence = PersistenceScheduler::spawn(
            SAVE_WORKER,
            self.players.clone(),
            self.storage.clone(),
            config.save_interval(),
            self.save_stats.clone(),
        )?;

        info!(
            jobs = catalog.len(),
            max_jobs = config.max_jobs,
            payout_ms = config.payout_interval().as_millis() as u64,
            save_secs = config.save_interval().as_secs(),
            "jobs configuration loaded"
        );
        Ok(())
    }

    /// Stop workers, pay out what is pending, save everyone, close storage.
    ///
    /// Idempotent; only the first call does anything. Storage is closed even
    /// when the final save fails.
    pub fn shutdown(&self) -> EngineResult<()> {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        workers.stop();

        let report = self.payouts.flush(&*self.economy);
        let saved = self.players.save_all(&*self.storage);
        if let Err(err) = &saved {
            error!(error = %err, "final save failed");
        }
        self.storage.close();

        let saved = saved?;
        info!(saved, paid = report.payments, "jobs engine shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // ---------------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------------

    pub fn player_join(&self, player: PlayerId) -> EngineResult<()> {
        self.ensure_running()?;
        let catalog = self.catalog();
        self.players.join(player, &catalog, &*self.storage)?;
        Ok(())
    }

    /// End a session, saving the record first if configured to.
    pub fn player_quit(&self, player: PlayerId) -> EngineResult<()> {
        let save = self.config().save_on_disconnect;
        if let Err(err) = self.players.quit(player, &*self.storage, save) {
            warn!(player = %player, error = %err, "could not save player on quit");
            return Err(err.into());
        }
        Ok(())
    }

    pub fn online_players(&self) -> usize {
        self.players.len()
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    /// Reward `action` using the environmental multiplier for the player.
    pub fn perform_action(
        &self,
        player: PlayerId,
        action: &ActionInfo,
    ) -> EngineResult<Vec<RewardOutcome>> {
        let multiplier = self.multiplier.multiplier(player);
        self.action_with_multiplier(player, action, multiplier)
    }

    /// Reward `action` with an explicit multiplier.
    pub fn action_with_multiplier(
        &self,
        player: PlayerId,
        action: &ActionInfo,
        multiplier: f64,
    ) -> EngineResult<Vec<RewardOutcome>> {
        let record = self.online(player)?;
        let (catalog, mirror_xp) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            (state.catalog.clone(), state.config.add_xp_player)
        };

        let outcomes = {
            let mut record = record.lock().unwrap_or_else(|e| e.into_inner());
            RewardComputer::compute_and_apply(
                &mut record,
                catalog.none_job().map(|j| j.as_ref()),
                action,
                multiplier,
                &*self.payouts,
            )
        };

        for outcome in &outcomes {
            if outcome.income != 0.0 || outcome.experience != 0.0 {
                self.notifier
                    .rewarded(player, &outcome.job, outcome.income, outcome.experience);
            }
            if let Some(level_up) = outcome.level_up {
                self.report_level_up(player, &outcome.job, level_up, &catalog);
            }
            if mirror_xp && outcome.base_experience > 0.0 {
                self.notifier
                    .experience_gained(player, outcome.base_experience);
            }
        }
        Ok(outcomes)
    }

    // ---------------------------------------------------------------------
    // Job membership
    // ---------------------------------------------------------------------

    /// Start `job` at level 1.
    ///
    /// Rejects the none job, unknown and already-held jobs, joins beyond the
    /// max-jobs ceiling, and jobs with no free slot.
    pub fn join_job(&self, player: PlayerId, job: &str) -> EngineResult<()> {
        if JobCatalog::is_none_job(job) {
            return Err(DomainError::NoneJob.into());
        }
        let record = self.online(player)?;
        let (catalog, limit) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            (state.catalog.clone(), state.config.max_jobs_limit())
        };
        let definition = catalog
            .get(job)
            .ok_or_else(|| DomainError::unknown_job(job))?
            .clone();

        let mut record = record.lock().unwrap_or_else(|e| e.into_inner());
        if record.holds(definition.name()) {
            return Err(DomainError::AlreadyHeld(definition.name().to_string()).into());
        }
        if let Some(max) = limit {
            if record.job_count() >= max {
                return Err(DomainError::JobLimitReached { max }.into());
            }
        }
        if !self.slots.try_take_slot(definition.name()) {
            return Err(DomainError::NoFreeSlots(definition.name().to_string()).into());
        }
        if let Err(err) = record.join(definition.clone(), limit) {
            self.slots.leave_slot(definition.name());
            return Err(err.into());
        }
        info!(player = %player, job = definition.name(), "joined job");
        Ok(())
    }

    fn report_level_up(
        &self,
        player: PlayerId,
        job: &str,
        level_up: LevelUp,
        catalog: &JobCatalog,
    ) {
        let new_title = catalog.titles().new_title(level_up.from, level_up.to);
        self.notifier.leveled_up(player, job, level_up, new_title);
    }

    /// Leave `job`, releasing its slot.
    ///
    /// Holding fewer jobs lowers the thresholds of the rest; level-ups this
    /// causes are reported like any other.
    pub fn leave_job(&self, player: PlayerId, job: &str) -> EngineResult<()> {
        let record = self.online(player)?;
        let departure = record
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .leave(job)?;
        let left = departure.left.job().name();
        self.slots.leave_slot(left);
        info!(player = %player, job = left, "left job");

        let catalog = self.catalog();
        for (job, level_up) in departure.level_ups {
            self.report_level_up(player, &job, level_up, &catalog);
        }
        Ok(())
    }

    /// Leave every held job. Returns the names of the jobs left.
    pub fn leave_all_jobs(&self, player: PlayerId) -> EngineResult<Vec<String>> {
        let record = self.online(player)?;
        let left = record.lock().unwrap_or_else(|e| e.into_inner()).leave_all();
        let names: Vec<String> = left.iter().map(|p| p.job().name().to_string()).collect();
        for name in &names {
            self.slots.leave_slot(name);
        }
        Ok(names)
    }

    // ---------------------------------------------------------------------
    // Queries and manual operations
    // ---------------------------------------------------------------------

    /// Jobs held by an online player.
    pub fn job_count(&self, player: PlayerId) -> EngineResult<usize> {
        let record = self.online(player)?;
        let count = record.lock().unwrap_or_else(|e| e.into_inner()).job_count();
        Ok(count)
    }

    /// `(job, level, experience)` for each job an online player holds.
    pub fn progressions(&self, player: PlayerId) -> EngineResult<Vec<(String, u32, f64)>> {
        let record = self.online(player)?;
        let record = record.lock().unwrap_or_else(|e| e.into_inner());
        Ok(record
            .progressions()
            .iter()
            .map(|p| (p.job().name().to_string(), p.level(), p.experience()))
            .collect())
    }

    pub fn used_slots(&self, job: &str) -> u32 {
        self.slots.used_slots(job)
    }

    pub fn capacity_available(&self, job: &str) -> bool {
        self.slots.capacity_available(job)
    }

    pub fn slot_usage(&self) -> Vec<SlotUsage> {
        self.slots.usage()
    }

    pub fn pending_payout(&self, player: PlayerId) -> f64 {
        self.payouts.pending(player)
    }

    /// Pay out everything pending now, outside the worker's schedule.
    pub fn flush_payouts(&self) -> FlushReport {
        self.payouts.flush(&*self.economy)
    }

    /// Save every online record now. Returns how many were saved.
    pub fn save_all(&self) -> EngineResult<usize> {
        Ok(self.players.save_all(&*self.storage)?)
    }

    pub fn payout_stats(&self) -> PayoutStats {
        self.payouts.stats()
    }

    pub fn save_stats(&self) -> SaveStats {
        self.save_stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn config(&self) -> EngineConfig {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .clone()
    }

    pub fn catalog(&self) -> Arc<JobCatalog> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .catalog
            .clone()
    }
}

impl std::fmt::Debug for JobsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobsEngine")
            .field("online_players", &self.players.len())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use jobcraft_core::{ActionKind, JobDefinition, NONE_JOB_NAME};

    use crate::config::StaticConfig;
    use crate::economy::InMemoryEconomy;
    use crate::storage::InMemoryStorage;

    fn engine() -> (JobsEngine, Arc<InMemoryStorage>, Arc<InMemoryEconomy>) {
        let catalog = JobCatalog::new(
            vec![
                JobDefinition::builder("Miner")
                    .max_slots(1)
                    .reward(ActionKind::Break, "stone", 2.0, 10.0)
                    .build()
                    .unwrap(),
                JobDefinition::builder("Farmer")
                    .reward(ActionKind::Break, "wheat", 1.0, 5.0)
                    .build()
                    .unwrap(),
                JobDefinition::builder("Hunter").build().unwrap(),
            ],
            Some(
                JobDefinition::builder(NONE_JOB_NAME)
                    .reward(ActionKind::Break, "stone", 0.5, 1.0)
                    .build_none()
                    .unwrap(),
            ),
        )
        .unwrap();
        let config = EngineConfig::default()
            .with_max_jobs(2)
            .with_intervals(Duration::ZERO, Duration::from_secs(3600));
        let storage = Arc::new(InMemoryStorage::new());
        let economy = Arc::new(InMemoryEconomy::new());
        let engine = JobsEngine::new(
            Arc::new(StaticConfig::new(config, catalog)),
            storage.clone(),
            economy.clone(),
        );
        (engine, storage, economy)
    }

    #[test]
    fn join_job_enforces_the_rules() {
        let (engine, _, _) = engine();
        let player = PlayerId::new();
        engine.startup(&[player]).unwrap();

        assert!(matches!(
            engine.join_job(player, NONE_JOB_NAME),
            Err(EngineError::Domain(DomainError::NoneJob))
        ));
        assert!(matches!(
            engine.join_job(player, "Wizard"),
            Err(EngineError::Domain(DomainError::UnknownJob(_)))
        ));

        engine.join_job(player, "miner").unwrap();
        assert!(matches!(
            engine.join_job(player, "Miner"),
            Err(EngineError::Domain(DomainError::AlreadyHeld(_)))
        ));
        engine.join_job(player, "Farmer").unwrap();
        assert!(matches!(
            engine.join_job(player, "Hunter"),
            Err(EngineError::Domain(DomainError::JobLimitReached { max: 2 }))
        ));
        assert_eq!(engine.job_count(player).unwrap(), 2);
        engine.shutdown().unwrap();
    }

    #[test]
    fn full_job_rejects_a_second_player() {
        let (engine, _, _) = engine();
        let (a, b) = (PlayerId::new(), PlayerId::new());
        engine.startup(&[a, b]).unwrap();

        engine.join_job(a, "Miner").unwrap();
        assert!(!engine.capacity_available("Miner"));
        assert!(matches!(
            engine.join_job(b, "Miner"),
            Err(EngineError::Domain(DomainError::NoFreeSlots(_)))
        ));
        assert_eq!(engine.used_slots("Miner"), 1);

        engine.leave_job(a, "Miner").unwrap();
        engine.join_job(b, "Miner").unwrap();
        assert_eq!(engine.used_slots("Miner"), 1);
        engine.shutdown().unwrap();
    }

    #[test]
    fn leave_all_releases_every_slot() {
        let (engine, _, _) = engine();
        let player = PlayerId::new();
        engine.startup(&[player]).unwrap();
        engine.join_job(player, "Miner").unwrap();
        engine.join_job(player, "Farmer").unwrap();

        let left = engine.leave_all_jobs(player).unwrap();
        assert_eq!(left, vec!["Miner".to_string(), "Farmer".to_string()]);
        assert_eq!(engine.used_slots("Miner"), 0);
        assert_eq!(engine.used_slots("Farmer"), 0);
        assert_eq!(engine.job_count(player).unwrap(), 0);
        engine.shutdown().unwrap();
    }

    #[test]
    fn offline_players_are_rejected() {
        let (engine, _, _) = engine();
        engine.startup(&[]).unwrap();
        let stranger = PlayerId::new();
        assert!(matches!(
            engine.perform_action(stranger, &ActionInfo::new(ActionKind::Break, "stone")),
            Err(EngineError::PlayerNotOnline(p)) if p == stranger
        ));
        engine.shutdown().unwrap();
    }

    #[test]
    fn shutdown_is_idempotent_and_final() {
        let (engine, storage, economy) = engine();
        let player = PlayerId::new();
        engine.startup(&[player]).unwrap();
        engine
            .perform_action(player, &ActionInfo::new(ActionKind::Break, "stone"))
            .unwrap();

        engine.shutdown().unwrap();
        engine.shutdown().unwrap();

        assert_eq!(economy.payments(), vec![(player, 0.5)]);
        assert!(storage.get(player).is_some());
        assert!(storage.is_closed());
        assert!(matches!(engine.reload(), Err(EngineError::ShutDown)));
        assert!(matches!(engine.player_join(PlayerId::new()), Err(EngineError::ShutDown)));
    }
}

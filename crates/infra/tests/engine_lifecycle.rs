//! End-to-end engine scenarios.
//!
//! Tests: session → action → payout buffer → economy, and
//! online records → persistence worker → storage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use jobcraft_core::{
    ActionInfo, ActionKind, DomainError, JobCatalog, JobDefinition, LevelUp, LevelingCurve,
    PlayerId, PlayerSnapshot, ProgressionSnapshot, Title, TitleLadder, NONE_JOB_NAME,
};
use jobcraft_infra::{
    Economy, EconomyError, EngineConfig, EngineError, InMemoryEconomy, InMemoryStorage,
    JobsEngine, Notifier, StaticConfig, Storage, StorageError,
};

fn catalog() -> JobCatalog {
    let miner = JobDefinition::builder("Miner")
        .max_slots(1)
        .leveling(LevelingCurve::constant(100.0))
        .reward(ActionKind::Break, "stone", 2.0, 60.0)
        .reward(ActionKind::Break, "iron", 5.0, 50.0)
        .build()
        .unwrap();
    let farmer = JobDefinition::builder("Farmer")
        .reward(ActionKind::Break, "wheat", 1.0, 5.0)
        .build()
        .unwrap();
    let none = JobDefinition::builder(NONE_JOB_NAME)
        .reward(ActionKind::Break, "stone", 0.25, 40.0)
        .build_none()
        .unwrap();
    JobCatalog::new(vec![miner, farmer], Some(none)).unwrap()
}

fn quiet_config() -> EngineConfig {
    EngineConfig::default().with_intervals(Duration::ZERO, Duration::from_secs(3600))
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn full_session_is_paid_and_saved() {
    let storage = Arc::new(InMemoryStorage::new());
    let economy = Arc::new(InMemoryEconomy::new());
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), catalog())),
        storage.clone(),
        economy.clone(),
    );
    let player = PlayerId::new();

    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Miner").unwrap();
    engine
        .perform_action(player, &ActionInfo::new(ActionKind::Break, "stone"))
        .unwrap();
    engine
        .perform_action(player, &ActionInfo::new(ActionKind::Break, "iron"))
        .unwrap();
    assert_eq!(engine.pending_payout(player), 7.0);

    engine.shutdown().unwrap();

    assert_eq!(economy.payments(), vec![(player, 7.0)]);
    let saved = storage.get(player).unwrap();
    assert_eq!(
        saved.jobs,
        vec![ProgressionSnapshot {
            job: "Miner".into(),
            level: 2,
            experience: 10.0,
        }]
    );
    assert!(storage.is_closed());
}

#[test]
fn payout_worker_batches_credits_per_window() {
    let economy = Arc::new(InMemoryEconomy::new());
    let config = EngineConfig::default().with_intervals(Duration::ZERO, Duration::from_millis(200));
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(config, catalog())),
        Arc::new(InMemoryStorage::new()),
        economy.clone(),
    );
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Farmer").unwrap();

    // 10 + 15 credited inside one window.
    engine
        .action_with_multiplier(player, &ActionInfo::new(ActionKind::Break, "wheat"), 10.0)
        .unwrap();
    engine
        .action_with_multiplier(player, &ActionInfo::new(ActionKind::Break, "wheat"), 15.0)
        .unwrap();

    assert!(wait_until(|| !economy.payments().is_empty()));
    assert_eq!(economy.payments(), vec![(player, 25.0)]);
    engine.shutdown().unwrap();
    assert_eq!(economy.payments().len(), 1);
}

#[test]
fn concurrent_credits_are_paid_exactly_once() {
    let economy = Arc::new(InMemoryEconomy::new());
    let config = EngineConfig::default().with_intervals(Duration::ZERO, Duration::from_millis(2));
    let engine = Arc::new(JobsEngine::new(
        Arc::new(StaticConfig::new(config, catalog())),
        Arc::new(InMemoryStorage::new()),
        economy.clone(),
    ));
    let players: Vec<PlayerId> = (0..4).map(|_| PlayerId::new()).collect();
    engine.startup(&players).unwrap();

    let handles: Vec<_> = players
        .iter()
        .map(|&player| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    engine
                        .perform_action(player, &ActionInfo::new(ActionKind::Break, "stone"))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    engine.shutdown().unwrap();

    // Four jobless players, 500 stones each at 0.25.
    assert_eq!(economy.total_paid(), 4.0 * 500.0 * 0.25);
    for player in players {
        assert_eq!(economy.balance(player), 125.0);
    }
}

#[derive(Default)]
struct FlakyStorage {
    inner: InMemoryStorage,
    save_calls: AtomicUsize,
}

impl Storage for FlakyStorage {
    fn load_player(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StorageError> {
        self.inner.load_player(player)
    }

    fn save_player(&self, snapshot: &PlayerSnapshot) -> Result<(), StorageError> {
        self.inner.save_player(snapshot)
    }

    fn save_all(&self, _snapshots: &[PlayerSnapshot]) -> Result<(), StorageError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Io("disk full".into()))
    }

    fn slots_taken(&self, job: &str) -> Result<u32, StorageError> {
        self.inner.slots_taken(job)
    }
}

#[test]
fn save_failure_stops_auto_save_but_not_the_final_save() {
    let storage = Arc::new(FlakyStorage::default());
    let config = EngineConfig::default()
        .with_intervals(Duration::from_millis(10), Duration::from_secs(3600));
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(config, catalog())),
        storage.clone(),
        Arc::new(InMemoryEconomy::new()),
    );
    engine.startup(&[PlayerId::new()]).unwrap();

    assert!(wait_until(|| engine.save_stats().stopped_on_error));
    // Several intervals later, no further cycles ran.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(storage.save_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.save_stats().cycles, 0);

    let result = engine.shutdown();
    assert!(matches!(result, Err(EngineError::Storage(StorageError::Io(_)))));
    assert_eq!(storage.save_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn slot_capacity_survives_reload_from_storage() {
    let storage = Arc::new(InMemoryStorage::new());
    let holder = PlayerId::new();
    storage.insert(PlayerSnapshot {
        player_id: holder,
        jobs: vec![ProgressionSnapshot {
            job: "miner".into(),
            level: 4,
            experience: 0.0,
        }],
    });
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), catalog())),
        storage,
        Arc::new(InMemoryEconomy::new()),
    );
    let newcomer = PlayerId::new();
    engine.startup(&[newcomer]).unwrap();

    assert_eq!(engine.used_slots("Miner"), 1);
    assert!(!engine.capacity_available("Miner"));
    assert!(matches!(
        engine.join_job(newcomer, "Miner"),
        Err(EngineError::Domain(DomainError::NoFreeSlots(_)))
    ));
    assert_eq!(engine.used_slots("Miner"), 1);
    engine.shutdown().unwrap();
}

#[test]
fn jobless_player_earns_none_income_without_experience() {
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), catalog())),
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryEconomy::new()),
    );
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();

    let outcomes = engine
        .perform_action(player, &ActionInfo::new(ActionKind::Break, "stone"))
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].job, NONE_JOB_NAME);
    assert_eq!(outcomes[0].experience, 0.0);
    assert_eq!(engine.pending_payout(player), 0.25);
    assert!(engine.progressions(player).unwrap().is_empty());
    engine.shutdown().unwrap();
}

#[test]
fn reload_rebinds_records_and_drops_removed_jobs() {
    let source = Arc::new(StaticConfig::new(quiet_config(), catalog()));
    let engine = JobsEngine::new(
        source.clone(),
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryEconomy::new()),
    );
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Miner").unwrap();
    engine.join_job(player, "Farmer").unwrap();

    // Farmer removed, Miner now pays more.
    let richer_miner = JobDefinition::builder("Miner")
        .reward(ActionKind::Break, "stone", 20.0, 1.0)
        .build()
        .unwrap();
    source.set_catalog(JobCatalog::new(vec![richer_miner], None).unwrap());
    engine.reload().unwrap();

    let held: Vec<String> = engine
        .progressions(player)
        .unwrap()
        .into_iter()
        .map(|(job, _, _)| job)
        .collect();
    assert_eq!(held, vec!["Miner".to_string()]);
    assert_eq!(engine.used_slots("Farmer"), 0);

    let outcomes = engine
        .perform_action(player, &ActionInfo::new(ActionKind::Break, "stone"))
        .unwrap();
    assert_eq!(outcomes[0].income, 20.0);
    engine.shutdown().unwrap();
}

#[test]
fn reload_applies_a_new_job_limit() {
    let source = Arc::new(StaticConfig::new(quiet_config().with_max_jobs(1), catalog()));
    let engine = JobsEngine::new(
        source.clone(),
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryEconomy::new()),
    );
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Miner").unwrap();
    assert!(matches!(
        engine.join_job(player, "Farmer"),
        Err(EngineError::Domain(DomainError::JobLimitReached { max: 1 }))
    ));

    source.set_config(quiet_config().with_max_jobs(2));
    engine.reload().unwrap();

    assert_eq!(engine.config().max_jobs, 2);
    engine.join_job(player, "Farmer").unwrap();
    assert_eq!(engine.job_count(player).unwrap(), 2);
    engine.shutdown().unwrap();
}

#[test]
fn quit_saves_when_configured() {
    let storage = Arc::new(InMemoryStorage::new());
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), catalog())),
        storage.clone(),
        Arc::new(InMemoryEconomy::new()),
    );
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Farmer").unwrap();
    engine.player_quit(player).unwrap();

    assert_eq!(engine.online_players(), 0);
    assert!(storage.get(player).unwrap().holds("farmer"));

    // Back online: progression restored.
    engine.player_join(player).unwrap();
    assert_eq!(engine.job_count(player).unwrap(), 1);
    engine.shutdown().unwrap();
}

#[derive(Default)]
struct RecordingNotifier {
    level_ups: Mutex<Vec<(String, u32, u32)>>,
    titles: Mutex<Vec<String>>,
    mirrored: Mutex<Vec<f64>>,
}

impl Notifier for RecordingNotifier {
    fn leveled_up(
        &self,
        _player: PlayerId,
        job: &str,
        level_up: LevelUp,
        new_title: Option<&Title>,
    ) {
        self.level_ups
            .lock()
            .unwrap()
            .push((job.to_string(), level_up.from, level_up.to));
        if let Some(title) = new_title {
            self.titles.lock().unwrap().push(title.name().to_string());
        }
    }

    fn experience_gained(&self, _player: PlayerId, amount: f64) {
        self.mirrored.lock().unwrap().push(amount);
    }
}

#[test]
fn level_ups_and_mirrored_experience_are_reported() {
    let notifier = Arc::new(RecordingNotifier::default());
    let config = quiet_config().with_add_xp_player(true);
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(config, catalog())),
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryEconomy::new()),
    )
    .with_notifier(notifier.clone());
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Miner").unwrap();

    for target in ["stone", "iron"] {
        engine
            .action_with_multiplier(player, &ActionInfo::new(ActionKind::Break, target), 2.0)
            .unwrap();
    }

    // 120 xp: level 1 -> 2 with 20 left; +100 xp: level 2 -> 3 with 20 left.
    assert_eq!(
        *notifier.level_ups.lock().unwrap(),
        vec![("Miner".to_string(), 1, 2), ("Miner".to_string(), 2, 3)]
    );
    // Mirrored experience is the unscaled base.
    assert_eq!(*notifier.mirrored.lock().unwrap(), vec![60.0, 50.0]);
    engine.shutdown().unwrap();
}

#[test]
fn level_ups_report_newly_earned_titles() {
    let titles = TitleLadder::new(vec![
        Title::new("Apprentice", "A", 0).unwrap(),
        Title::new("Journeyman", "J", 3).unwrap(),
    ]);
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), catalog().with_titles(titles))),
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryEconomy::new()),
    )
    .with_notifier(notifier.clone());
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine.join_job(player, "Miner").unwrap();

    // 120 xp: 1 -> 2, still an Apprentice. 100 xp: 2 -> 3, a Journeyman.
    for target in ["stone", "iron"] {
        engine
            .action_with_multiplier(player, &ActionInfo::new(ActionKind::Break, target), 2.0)
            .unwrap();
    }

    assert_eq!(notifier.level_ups.lock().unwrap().len(), 2);
    assert_eq!(*notifier.titles.lock().unwrap(), vec!["Journeyman".to_string()]);
    engine.shutdown().unwrap();
}

#[test]
fn leaving_a_job_reports_level_ups_of_the_rest() {
    // Threshold = 100 × (1 + 0.5 × (jobs − 1))^(level − 1).
    let leveling = LevelingCurve::Exponential {
        base: 100.0,
        growth: 1.0,
        growth_per_extra_job: 0.5,
    };
    let jobs = ["Miner", "Farmer", "Hunter"]
        .into_iter()
        .map(|name| {
            JobDefinition::builder(name)
                .leveling(leveling.clone())
                .build()
                .unwrap()
        })
        .collect();
    let storage = Arc::new(InMemoryStorage::new());
    let player = PlayerId::new();
    storage.insert(PlayerSnapshot {
        player_id: player,
        jobs: vec![
            ProgressionSnapshot {
                job: "Miner".into(),
                level: 2,
                experience: 150.0,
            },
            ProgressionSnapshot {
                job: "Farmer".into(),
                level: 1,
                experience: 0.0,
            },
            ProgressionSnapshot {
                job: "Hunter".into(),
                level: 1,
                experience: 0.0,
            },
        ],
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), JobCatalog::new(jobs, None).unwrap())),
        storage,
        Arc::new(InMemoryEconomy::new()),
    )
    .with_notifier(notifier.clone());
    engine.startup(&[player]).unwrap();

    engine.leave_job(player, "Hunter").unwrap();

    assert_eq!(
        *notifier.level_ups.lock().unwrap(),
        vec![("Miner".to_string(), 2, 3)]
    );
    assert_eq!(engine.used_slots("Hunter"), 0);
    let miner = engine
        .progressions(player)
        .unwrap()
        .into_iter()
        .find(|(job, _, _)| job == "Miner")
        .unwrap();
    assert_eq!(miner, ("Miner".to_string(), 3, 0.0));
    engine.shutdown().unwrap();
}

struct BrokenEconomy;

impl Economy for BrokenEconomy {
    fn pay(&self, player: PlayerId, _amount: f64) -> Result<(), EconomyError> {
        Err(EconomyError::NoAccount(player))
    }
}

#[test]
fn failed_payments_are_counted_not_fatal() {
    let engine = JobsEngine::new(
        Arc::new(StaticConfig::new(quiet_config(), catalog())),
        Arc::new(InMemoryStorage::new()),
        Arc::new(BrokenEconomy),
    );
    let player = PlayerId::new();
    engine.startup(&[player]).unwrap();
    engine
        .perform_action(player, &ActionInfo::new(ActionKind::Break, "stone"))
        .unwrap();

    let report = engine.flush_payouts();
    assert_eq!(report.failures, 1);
    assert_eq!(engine.pending_payout(player), 0.0);
    assert_eq!(engine.payout_stats().amount_lost, 0.25);
    engine.shutdown().unwrap();
}

//! Engine configuration and the collaborator that supplies it on reload.

use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use jobcraft_core::{JobCatalog, TitleEntry, TitleLadder};

pub const DEFAULT_SAVE_PERIOD_MINUTES: i64 = 10;
pub const DEFAULT_ECONOMY_BATCH_DELAY_SECS: i64 = 5;
pub const DEFAULT_MAX_JOBS: u32 = 3;

/// Exact worker intervals, bypassing the minute/second settings.
///
/// A zero save interval disables auto-save.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkerIntervals {
    pub save: Duration,
    pub payout: Duration,
}

/// Settings the engine reads at every reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minutes between automatic saves.
    pub save_period_minutes: i64,
    /// Seconds between economy flushes.
    pub economy_batch_delay_secs: i64,
    /// Jobs a player may hold at once; 0 = unlimited.
    pub max_jobs: u32,
    /// Mirror job experience into the host's experience bar.
    pub add_xp_player: bool,
    /// Save a player's record when their session ends.
    pub save_on_disconnect: bool,
    #[serde(skip)]
    pub intervals: Option<WorkerIntervals>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_period_minutes: DEFAULT_SAVE_PERIOD_MINUTES,
            economy_batch_delay_secs: DEFAULT_ECONOMY_BATCH_DELAY_SECS,
            max_jobs: DEFAULT_MAX_JOBS,
            add_xp_player: false,
            save_on_disconnect: true,
            intervals: None,
        }
    }
}

impl EngineConfig {
    pub fn with_intervals(mut self, save: Duration, payout: Duration) -> Self {
        self.intervals = Some(WorkerIntervals { save, payout });
        self
    }

    pub fn with_max_jobs(mut self, max_jobs: u32) -> Self {
        self.max_jobs = max_jobs;
        self
    }

    pub fn with_add_xp_player(mut self, enabled: bool) -> Self {
        self.add_xp_player = enabled;
        self
    }

    /// Replace invalid values with defaults, logging each substitution.
    pub fn validated(mut self) -> Self {
        if self.save_period_minutes <= 0 {
            error!(
                value = self.save_period_minutes,
                "save period must be positive; resetting to {DEFAULT_SAVE_PERIOD_MINUTES} minutes"
            );
            self.save_period_minutes = DEFAULT_SAVE_PERIOD_MINUTES;
        }
        if self.economy_batch_delay_secs <= 0 {
            error!(
                value = self.economy_batch_delay_secs,
                "batch delay must be positive; resetting to {DEFAULT_ECONOMY_BATCH_DELAY_SECS}s"
            );
            self.economy_batch_delay_secs = DEFAULT_ECONOMY_BATCH_DELAY_SECS;
        }
        if let Some(intervals) = self.intervals {
            if intervals.payout.is_zero() {
                warn!("payout interval override is zero; using the batch delay instead");
                self.intervals = None;
            }
        }
        self
    }

    /// Read `JOBCRAFT_*` environment variables over the defaults.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("JOBCRAFT_SAVE_PERIOD_MINUTES") {
            config.save_period_minutes = v;
        }
        if let Some(v) = env_parse("JOBCRAFT_ECONOMY_BATCH_DELAY_SECS") {
            config.economy_batch_delay_secs = v;
        }
        if let Some(v) = env_parse("JOBCRAFT_MAX_JOBS") {
            config.max_jobs = v;
        }
        if let Some(v) = env_parse("JOBCRAFT_ADD_XP_PLAYER") {
            config.add_xp_player = v;
        }
        if let Some(v) = env_parse("JOBCRAFT_SAVE_ON_DISCONNECT") {
            config.save_on_disconnect = v;
        }
        config.validated()
    }

    pub fn save_interval(&self) -> Duration {
        match self.intervals {
            Some(i) => i.save,
            None => Duration::from_secs(self.save_period_minutes.max(0) as u64 * 60),
        }
    }

    pub fn payout_interval(&self) -> Duration {
        match self.intervals {
            Some(i) => i.payout,
            None => Duration::from_secs(self.economy_batch_delay_secs.max(0) as u64),
        }
    }

    /// Job ceiling, `None` when unlimited.
    pub fn max_jobs_limit(&self) -> Option<usize> {
        (self.max_jobs > 0).then_some(self.max_jobs as usize)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

/// Build the title ladder from configured entries.
///
/// Invalid entries are skipped with an error log; the rest still load.
pub fn load_titles(entries: Vec<TitleEntry>) -> TitleLadder {
    let (ladder, rejected) = TitleLadder::from_entries(entries);
    for (key, err) in rejected {
        error!(title = %key, error = %err, "invalid title; skipping");
    }
    ladder
}

/// Supplies configuration and job definitions at every reload.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> (EngineConfig, JobCatalog);
}

/// In-process configuration, replaceable between reloads.
#[derive(Debug, Default)]
pub struct StaticConfig {
    inner: RwLock<(EngineConfig, JobCatalog)>,
}

impl StaticConfig {
    pub fn new(config: EngineConfig, catalog: JobCatalog) -> Self {
        Self {
            inner: RwLock::new((config, catalog)),
        }
    }

    pub fn set_config(&self, config: EngineConfig) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).0 = config;
    }

    pub fn set_catalog(&self, catalog: JobCatalog) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).1 = catalog;
    }
}

impl ConfigSource for StaticConfig {
    fn load(&self) -> (EngineConfig, JobCatalog) {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

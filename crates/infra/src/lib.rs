//! Runtime layer: storage, economy, workers, configuration and the engine
//! context that ties them together.

pub mod config;
pub mod economy;
pub mod engine;
pub mod notify;
pub mod payout;
pub mod players;
pub mod slots;
pub mod storage;
pub mod workers;

pub use config::{load_titles, ConfigSource, EngineConfig, StaticConfig, WorkerIntervals};
pub use economy::{Economy, EconomyError, InMemoryEconomy};
pub use engine::{EngineError, EngineResult, JobsEngine};
pub use notify::{ConstantMultiplier, MultiplierSource, Notifier, NullNotifier, TracingNotifier};
pub use payout::{FlushReport, PayoutBuffer, PayoutStats};
pub use players::PlayerRegistry;
pub use slots::{SlotLedger, SlotUsage};
pub use storage::{InMemoryStorage, JsonFileStorage, Storage, StorageError};
pub use workers::{PayoutWorker, PersistenceScheduler, SaveStats, WorkerHandle};

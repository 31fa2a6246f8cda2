use thiserror::Error;

use jobcraft_core::{PlayerId, PlayerSnapshot};

/// Storage failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(String),
    #[error("storage encoding error: {0}")]
    Encoding(String),
    #[error("storage is closed")]
    Closed,
}

/// Durable home of player progression.
///
/// Calls come from the persistence worker, from session join/quit, and from
/// reload (slot counts). Implementations must be safe to share across threads.
pub trait Storage: Send + Sync {
    /// Load a player's persisted record, if any.
    fn load_player(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StorageError>;

    /// Persist one player's record, replacing the previous one.
    fn save_player(&self, snapshot: &PlayerSnapshot) -> Result<(), StorageError>;

    /// Persist a batch of records.
    ///
    /// The default saves one by one and stops at the first failure.
    fn save_all(&self, snapshots: &[PlayerSnapshot]) -> Result<(), StorageError> {
        for snapshot in snapshots {
            self.save_player(snapshot)?;
        }
        Ok(())
    }

    /// Number of persisted players holding `job` (case-insensitive).
    fn slots_taken(&self, job: &str) -> Result<u32, StorageError>;

    /// Release connections. Called once at shutdown.
    fn close(&self) {}
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn load_player(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StorageError> {
        (**self).load_player(player)
    }

    fn save_player(&self, snapshot: &PlayerSnapshot) -> Result<(), StorageError> {
        (**self).save_player(snapshot)
    }

    fn save_all(&self, snapshots: &[PlayerSnapshot]) -> Result<(), StorageError> {
        (**self).save_all(snapshots)
    }

    fn slots_taken(&self, job: &str) -> Result<u32, StorageError> {
        (**self).slots_taken(job)
    }

    fn close(&self) {
        (**self).close()
    }
}

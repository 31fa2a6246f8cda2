use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use jobcraft_core::{PlayerId, PlayerSnapshot};

use super::r#trait::{Storage, StorageError};

/// In-memory storage.
///
/// Intended for tests/dev. Slot counts are computed by scanning every stored
/// snapshot.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    players: RwLock<HashMap<PlayerId, PlayerSnapshot>>,
    batches: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a snapshot as if it had been saved earlier.
    pub fn insert(&self, snapshot: PlayerSnapshot) {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        players.insert(snapshot.player_id, snapshot);
    }

    pub fn get(&self, player: PlayerId) -> Option<PlayerSnapshot> {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players.get(&player).cloned()
    }

    pub fn len(&self) -> usize {
        self.players.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `save_all` calls received.
    pub fn batches_saved(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl Storage for InMemoryStorage {
    fn load_player(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StorageError> {
        self.ensure_open()?;
        Ok(self.get(player))
    }

    fn save_player(&self, snapshot: &PlayerSnapshot) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.insert(snapshot.clone());
        Ok(())
    }

    fn save_all(&self, snapshots: &[PlayerSnapshot]) -> Result<(), StorageError> {
        self.ensure_open()?;
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        for snapshot in snapshots {
            players.insert(snapshot.player_id, snapshot.clone());
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn slots_taken(&self, job: &str) -> Result<u32, StorageError> {
        self.ensure_open()?;
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        let count = players.values().filter(|s| s.holds(job)).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

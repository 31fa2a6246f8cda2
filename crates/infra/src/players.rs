//! Online player records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use jobcraft_core::{JobCatalog, PlayerId, PlayerRecord, PlayerSnapshot};

use crate::storage::{Storage, StorageError};

/// Shared handle to one online player's record.
pub type SharedRecord = Arc<Mutex<PlayerRecord>>;

/// Records of every online player.
///
/// The map lock is only held to look records up; each record has its own
/// mutex so actions for different players run concurrently.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    records: RwLock<HashMap<PlayerId, SharedRecord>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: PlayerId) -> Option<SharedRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&player).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bring a player online, loading their record from storage.
    ///
    /// Already-online players are returned as they are.
    pub fn join(
        &self,
        player: PlayerId,
        catalog: &JobCatalog,
        storage: &dyn Storage,
    ) -> Result<SharedRecord, StorageError> {
        if let Some(record) = self.get(player) {
            return Ok(record);
        }

        let record = match storage.load_player(player)? {
            Some(snapshot) => {
                let (record, skipped) = PlayerRecord::restore(&snapshot, catalog);
                for job in skipped {
                    warn!(
                        player = %player,
                        job = %job,
                        "dropping stored progression for unknown job"
                    );
                }
                record
            }
            None => PlayerRecord::new(player),
        };

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let shared = records
            .entry(player)
            .or_insert_with(|| Arc::new(Mutex::new(record)))
            .clone();
        debug!(player = %player, "player online");
        Ok(shared)
    }

    /// Take a player offline, saving their record first when `save` is set.
    ///
    /// The record is evicted even if the save fails.
    pub fn quit(
        &self,
        player: PlayerId,
        storage: &dyn Storage,
        save: bool,
    ) -> Result<(), StorageError> {
        let removed = {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            records.remove(&player)
        };
        let Some(record) = removed else {
            return Ok(());
        };
        debug!(player = %player, "player offline");
        if save {
            let snapshot = record.lock().unwrap_or_else(|e| e.into_inner()).snapshot();
            storage.save_player(&snapshot)?;
        }
        Ok(())
    }

    /// Snapshot every online record.
    ///
    /// Each record is locked only long enough to clone its state.
    pub fn snapshots(&self) -> Vec<PlayerSnapshot> {
        let records: Vec<SharedRecord> = {
            let map = self.records.read().unwrap_or_else(|e| e.into_inner());
            map.values().cloned().collect()
        };
        records
            .iter()
            .map(|r| r.lock().unwrap_or_else(|e| e.into_inner()).snapshot())
            .collect()
    }

    /// Save every online record in one batch. Returns how many were saved.
    pub fn save_all(&self, storage: &dyn Storage) -> Result<usize, StorageError> {
        let snapshots = self.snapshots();
        storage.save_all(&snapshots)?;
        Ok(snapshots.len())
    }

    /// Point every record at a reloaded catalog.
    pub fn rebind(&self, catalog: &JobCatalog) {
        let records: Vec<SharedRecord> = {
            let map = self.records.read().unwrap_or_else(|e| e.into_inner());
            map.values().cloned().collect()
        };
        for record in records {
            let mut record = record.lock().unwrap_or_else(|e| e.into_inner());
            for job in record.rebind(catalog) {
                warn!(
                    player = %record.id(),
                    job = %job,
                    "job no longer configured; progression dropped"
                );
            }
        }
        info!(players = self.len(), "player records rebound to reloaded jobs");
    }
}

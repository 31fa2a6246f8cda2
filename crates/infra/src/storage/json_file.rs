use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use jobcraft_core::{PlayerId, PlayerSnapshot};

use super::r#trait::{Storage, StorageError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    players: Vec<PlayerSnapshot>,
}

#[derive(Debug)]
struct State {
    players: BTreeMap<PlayerId, PlayerSnapshot>,
    closed: bool,
}

/// Single-file JSON storage.
///
/// The whole document is kept in memory and rewritten on every save: written
/// to `<path>.tmp` first, then renamed over `path`.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    state: Mutex<State>,
}

impl JsonFileStorage {
    /// Open (or start) the document at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let players = match fs::read(&path) {
            Ok(bytes) => {
                let doc: Document = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                doc.players.into_iter().map(|s| (s.player_id, s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };
        debug!(path = %path.display(), players = players.len(), "opened json storage");
        Ok(Self {
            path,
            state: Mutex::new(State {
                players,
                closed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, players: &BTreeMap<PlayerId, PlayerSnapshot>) -> Result<(), StorageError> {
        let doc = Document {
            players: players.values().cloned().collect(),
        };
        let bytes =
            serde_json::to_vec_pretty(&doc).map_err(|e| StorageError::Encoding(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<PlayerId, PlayerSnapshot>),
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(StorageError::Closed);
        }
        let mut next = state.players.clone();
        f(&mut next);
        self.write(&next)?;
        state.players = next;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn load_player(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StorageError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(StorageError::Closed);
        }
        Ok(state.players.get(&player).cloned())
    }

    fn save_player(&self, snapshot: &PlayerSnapshot) -> Result<(), StorageError> {
        self.update(|players| {
            players.insert(snapshot.player_id, snapshot.clone());
        })
    }

    fn save_all(&self, snapshots: &[PlayerSnapshot]) -> Result<(), StorageError> {
        self.update(|players| {
            for snapshot in snapshots {
                players.insert(snapshot.player_id, snapshot.clone());
            }
        })
    }

    fn slots_taken(&self, job: &str) -> Result<u32, StorageError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(StorageError::Closed);
        }
        let count = state.players.values().filter(|s| s.holds(job)).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
    }
}

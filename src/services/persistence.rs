//! Durable storage for the active timer record

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tracing::{debug, warn};

use crate::{error::StoreError, state::PersistedTimerRecord};

/// Key under which the active timer record is kept
pub const STORE_KEY: &str = "activeSessionTimer";

/// Single-slot store for the active timer record.
///
/// `load` never fails: a missing, unreadable or malformed value reads as
/// `None`. Writing replaces whatever was stored before.
pub trait TimerStore: Send + Sync {
    fn save(&self, record: &PersistedTimerRecord) -> Result<(), StoreError>;
    fn load(&self) -> Option<PersistedTimerRecord>;
    fn clear(&self) -> Result<(), StoreError>;
}

fn decode(raw: &str) -> Option<PersistedTimerRecord> {
    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring malformed timer record: {}", e);
            None
        }
    }
}

/// Record stored as `<dir>/activeSessionTimer.json`.
///
/// One directory corresponds to one browsing context, so two contexts never
/// see each other's timer.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STORE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl TimerStore for FileStore {
    fn save(&self, record: &PersistedTimerRecord) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string(record)?;
        let temp = self.temp_path();
        fs::write(&temp, content)?;
        if let Err(e) = fs::rename(&temp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&temp) {
                warn!("Failed to remove {}: {}", temp.display(), cleanup);
            }
            return Err(e.into());
        }
        debug!("Saved timer record to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Option<PersistedTimerRecord> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read timer record {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed timer record {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store holding the raw serialized value
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put arbitrary text in the slot, bypassing serialization
    pub fn set_raw(&self, raw: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.into());
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TimerStore for MemoryStore {
    fn save(&self, record: &PersistedTimerRecord) -> Result<(), StoreError> {
        let content = serde_json::to_string(record)?;
        self.set_raw(content);
        Ok(())
    }

    fn load(&self) -> Option<PersistedTimerRecord> {
        self.raw().as_deref().and_then(decode)
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

//! Economy Persistence
//!
//! The ledger persists through the [`SaveLoad`] capability. The saved form is
//! a flat record of named scalars and one integer list, so any key-value
//! backend can hold it.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

/// Flat persisted form of the player economy.
///
/// Every field is optional: a missing key reads as `None`, which the ledger
/// treats like a stored zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredEconomy {
    /// Spendable balance
    pub points: Option<i64>,
    /// Races played
    pub total_races: Option<i64>,
    /// Races won
    pub wins: Option<i64>,
    /// Races lost
    pub losses: Option<i64>,
    /// x2 booster inventory
    pub x2_boosters: Option<i64>,
    /// Guaranteed-win booster inventory
    pub guaranteed_boosters: Option<i64>,
    /// Unlocked backgrounds (never contains 0)
    pub purchased_background_ids: Option<Vec<u32>>,
    /// Active background
    pub selected_background_id: Option<u32>,
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Underlying storage failed.
    #[error("storage I/O failed for {}: {source}", .path.display())]
    Io {
        /// Location being read or written.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be encoded or decoded.
    #[error("malformed economy record: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Save/load capability injected into the ledger.
pub trait SaveLoad {
    /// Read the stored record. Absent storage yields an empty record.
    fn load(&mut self) -> Result<StoredEconomy, PersistError>;

    /// Replace the stored record.
    fn save(&mut self, record: &StoredEconomy) -> Result<(), PersistError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. Used for tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    record: Option<StoredEconomy>,
    saves: usize,
}

impl MemoryStore {
    /// Empty store (fresh install).
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a record.
    pub fn with_record(record: StoredEconomy) -> Self {
        Self { record: Some(record), saves: 0 }
    }

    /// Last saved record, if any.
    pub fn record(&self) -> Option<&StoredEconomy> {
        self.record.as_ref()
    }

    /// Number of saves performed.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SaveLoad for MemoryStore {
    fn load(&mut self) -> Result<StoredEconomy, PersistError> {
        Ok(self.record.clone().unwrap_or_default())
    }

    fn save(&mut self, record: &StoredEconomy) -> Result<(), PersistError> {
        self.record = Some(record.clone());
        self.saves += 1;
        Ok(())
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Default state file name.
pub const DEFAULT_STATE_FILE: &str = "chicken_race_state.json";

/// Store that keeps the record as one JSON object in a file.
///
/// Writes go to a sibling temp file first and are renamed over the target,
/// so an interrupted save leaves the previous state intact.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistError {
        PersistError::Io { path: path.to_path_buf(), source }
    }
}

impl SaveLoad for JsonFileStore {
    fn load(&mut self) -> Result<StoredEconomy, PersistError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No saved economy found, starting fresh");
            return Ok(StoredEconomy::default());
        }

        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| self.io_error(&self.path, e))?;
        let record = serde_json::from_str(&json)?;

        debug!(path = %self.path.display(), "Economy loaded");
        Ok(record)
    }

    fn save(&mut self, record: &StoredEconomy) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(record)?;
        let temp = self.temp_path();

        std::fs::write(&temp, json).map_err(|e| self.io_error(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(&self.path, e))?;

        debug!(path = %self.path.display(), "Economy saved");
        Ok(())
    }
}

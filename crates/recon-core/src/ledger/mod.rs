//! Ledger of tracked state
//!
//! The ledger maps each declared address to the tracked state of the remote
//! object it manages. It is persisted as TOML and is the only record of
//! which remote objects this reconciler owns.

mod entry;

pub use entry::LedgerEntry;

use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::Path;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StateError;
use crate::state::TrackedState;

pub const LEDGER_VERSION: &str = "1";

/// Persistent map from address to tracked state.
///
/// `lineage` identifies one ledger across saves; `serial` grows by one on
/// every save that changed content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    version: String,
    lineage: Uuid,
    serial: u64,
    #[serde(default)]
    entries: Vec<LedgerEntry>,
    #[serde(skip)]
    dirty: bool,
}

/// On-disk form of a [`Ledger`] being saved.
#[derive(Serialize)]
struct LedgerFile<'a> {
    version: &'a str,
    lineage: Uuid,
    serial: u64,
    entries: &'a [LedgerEntry],
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create a new empty ledger with a fresh lineage.
    pub fn new() -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            lineage: Uuid::new_v4(),
            serial: 0,
            entries: Vec::new(),
            dirty: false,
        }
    }

    /// Load a ledger from a TOML file with a shared lock.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ledger TOML file
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotFound`] if the file does not exist, and an
    /// error if it cannot be locked or parsed, carries an unsupported
    /// version, or tracks the same address twice.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StateError::NotFound {
                path: path.to_path_buf(),
            },
            _ => StateError::Io(e),
        })?;
        file.lock_shared()?;

        let mut content = String::new();
        (&file).read_to_string(&mut content)?;
        let ledger: Ledger = toml::from_str(&content)?;

        if ledger.version != LEDGER_VERSION {
            return Err(StateError::Ledger {
                message: format!(
                    "unsupported ledger version {} (expected {LEDGER_VERSION})",
                    ledger.version
                ),
            });
        }
        ledger.check_unique()?;

        tracing::debug!(path = %path.display(), entries = ledger.entries.len(), serial = ledger.serial, "Loaded ledger");
        Ok(ledger)
    }

    /// Load the ledger at `path`, or start a new one if the file is absent.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::load`], except that a missing file is not an error.
    pub fn load_or_new(path: &Path) -> Result<Self, StateError> {
        match Self::load(path) {
            Err(StateError::NotFound { .. }) => {
                tracing::info!(path = %path.display(), "No ledger found; starting empty");
                Ok(Self::new())
            }
            other => other,
        }
    }

    /// Save atomically under an exclusive lock: write a temp file, then
    /// rename it over the target.
    ///
    /// `serial` grows by one when there are unsaved changes. It is only
    /// committed once the rename succeeds, so a failed save leaves the
    /// ledger dirty and the next save uses the same serial.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the file cannot be locked, written or
    /// renamed, and [`StateError::TomlSer`] if the content cannot be
    /// rendered as TOML.
    pub fn save(&mut self, path: &Path) -> Result<(), StateError> {
        let serial = if self.dirty { self.serial + 1 } else { self.serial };
        let content = toml::to_string_pretty(&LedgerFile {
            version: &self.version,
            lineage: self.lineage,
            serial,
            entries: &self.entries,
        })?;

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        self.serial = serial;
        self.dirty = false;
        tracing::debug!(path = %path.display(), serial = self.serial, "Saved ledger");
        Ok(())
    }

    fn check_unique(&self) -> Result<(), StateError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.address.as_str()) {
                return Err(StateError::DuplicateAddress {
                    source_name: "ledger",
                    address: entry.address.clone(),
                });
            }
        }
        Ok(())
    }

    /// Identity of this ledger, stable across saves.
    pub fn lineage(&self) -> Uuid {
        self.lineage
    }

    /// Number of saves that changed content.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Whether there are changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// All tracked entries, in insertion order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry tracked at `address`, if any.
    pub fn get(&self, address: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.address == address)
    }

    /// Every tracked address, in insertion order.
    pub fn addresses(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.address.as_str()).collect()
    }

    /// Find the entry tracking the remote object `id` of type `type_name`.
    pub fn find_by_id(&self, type_name: &str, id: &str) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|e| e.state.type_name == type_name && e.state.id == id)
    }

    /// Insert or replace the state tracked at `address`.
    pub fn upsert(&mut self, address: impl Into<String>, state: TrackedState) {
        let address = address.into();
        match self.entries.iter_mut().find(|e| e.address == address) {
            Some(entry) => {
                if entry.state != state {
                    entry.state = state;
                    self.dirty = true;
                }
            }
            None => {
                self.entries.push(LedgerEntry::new(address, state));
                self.dirty = true;
            }
        }
    }

    /// Stop tracking `address`. Returns the removed entry.
    pub fn remove(&mut self, address: &str) -> Option<LedgerEntry> {
        let pos = self.entries.iter().position(|e| e.address == address)?;
        self.dirty = true;
        Some(self.entries.remove(pos))
    }
}

//! # Persistence Slots
//!
//! Where serialized inventories live between sessions.
//!
//! - [`SaveSlot`]: one local key-value slot, read at bootstrap and rewritten
//!   by [`SlotPersister`] whenever the inventory changes.
//! - [`SavedStateSource`]: the remote save service, consulted once at
//!   session start.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{EconomyError, EconomyResult};
use crate::events::{EconomyEvent, EconomyObserver};
use crate::inventory::Inventory;

/// A single local slot holding one serialized inventory.
pub trait SaveSlot: Send + Sync {
    /// Reads the slot; `None` if nothing was ever stored.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the slot exists but cannot be read.
    fn load(&self) -> EconomyResult<Option<String>>;

    /// Overwrites the slot.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the write fails.
    fn store(&self, snapshot: &str) -> EconomyResult<()>;
}

/// Slot backed by a file on disk.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileSaveSlot {
    path: PathBuf,
}

impl FileSaveSlot {
    /// Creates a slot at `path`. Nothing is touched until the first store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The slot's file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveSlot for FileSaveSlot {
    fn load(&self) -> EconomyResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EconomyError::Persistence(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn store(&self, snapshot: &str) -> EconomyResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                EconomyError::Persistence(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, snapshot).map_err(|e| {
            EconomyError::Persistence(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            EconomyError::Persistence(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

/// In-memory slot.
#[derive(Debug, Default)]
pub struct MemorySaveSlot {
    contents: Mutex<Option<String>>,
    writes: Mutex<u64>,
}

impl MemorySaveSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot already holding `snapshot`.
    pub fn with_contents(snapshot: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(snapshot.into())),
            writes: Mutex::new(0),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }

    /// Number of successful stores.
    #[must_use]
    pub fn writes(&self) -> u64 {
        *self.writes.lock()
    }
}

impl SaveSlot for MemorySaveSlot {
    fn load(&self) -> EconomyResult<Option<String>> {
        Ok(self.contents())
    }

    fn store(&self, snapshot: &str) -> EconomyResult<()> {
        *self.contents.lock() = Some(snapshot.to_string());
        *self.writes.lock() += 1;
        Ok(())
    }
}

impl<S: SaveSlot + ?Sized> SaveSlot for Arc<S> {
    fn load(&self) -> EconomyResult<Option<String>> {
        (**self).load()
    }

    fn store(&self, snapshot: &str) -> EconomyResult<()> {
        (**self).store(snapshot)
    }
}

/// Remote save service.
#[async_trait]
pub trait SavedStateSource: Send + Sync {
    /// Fetches the player's last saved snapshot.
    ///
    /// # Errors
    ///
    /// Any error means "no usable remote state"; bootstrap falls back.
    async fn fetch_saved_state(&self, player_id: &str) -> EconomyResult<String>;
}

/// Observer that rewrites a [`SaveSlot`] whenever the inventory changes.
///
/// Write failures are logged and swallowed; the operation that triggered the
/// event has already succeeded.
#[derive(Debug)]
pub struct SlotPersister<S> {
    slot: S,
}

impl<S: SaveSlot> SlotPersister<S> {
    /// Wraps a slot.
    pub const fn new(slot: S) -> Self {
        Self { slot }
    }

    /// The wrapped slot.
    pub const fn slot(&self) -> &S {
        &self.slot
    }
}

impl<S: SaveSlot> EconomyObserver for SlotPersister<S> {
    fn on_event(&self, event: &EconomyEvent, inventory: &Inventory) {
        if !event.mutates_inventory() {
            return;
        }
        let result = inventory.to_json().and_then(|json| self.slot.store(&json));
        if let Err(e) = result {
            tracing::warn!(user_id = inventory.user_id(), error = %e, "failed to persist inventory");
        }
    }
}

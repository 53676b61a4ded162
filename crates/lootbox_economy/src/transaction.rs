//! # Inventory Transactions
//!
//! **All-or-nothing compound operations**
//!
//! A purchase touches two parts of the inventory: it reserves a container
//! slot (cooldown gate) and then charges the price (ledger). If the second
//! step fails the first must be undone. [`InventoryTransaction`] makes that
//! explicit:
//!
//! ```text
//! begin()  -> snapshot taken
//!   step 1 -> mutate
//!   step 2 -> mutate (fails?)
//! commit() -> snapshot discarded
//! drop     -> not committed: snapshot restored
//! ```
//!
//! Only one transaction can exist per inventory at a time since it holds the
//! `&mut` borrow.

use std::ops::{Deref, DerefMut};

use crate::inventory::{Inventory, InventorySnapshot};

/// Transaction handle over one inventory.
///
/// Dereferences to the inventory so the crate's mutators can be called on it
/// directly. Dropping the handle without [`commit`](Self::commit) rolls back.
pub struct InventoryTransaction<'a> {
    /// The inventory being mutated.
    inventory: &'a mut Inventory,
    /// State to restore on rollback; `None` once finalized.
    snapshot: Option<InventorySnapshot>,
    /// Operation label for logs.
    label: &'static str,
}

impl<'a> InventoryTransaction<'a> {
    /// Begins a transaction.
    pub fn begin(inventory: &'a mut Inventory, label: &'static str) -> Self {
        let snapshot = Some(inventory.snapshot());
        Self {
            inventory,
            snapshot,
            label,
        }
    }

    /// Keeps every change made through this handle.
    pub fn commit(mut self) {
        self.snapshot = None;
    }

    /// Discards every change made through this handle.
    pub fn rollback(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.inventory.restore(snapshot);
            tracing::debug!(
                user_id = self.inventory.user_id(),
                op = self.label,
                "inventory transaction rolled back"
            );
        }
    }
}

impl Deref for InventoryTransaction<'_> {
    type Target = Inventory;

    fn deref(&self) -> &Inventory {
        self.inventory
    }
}

impl DerefMut for InventoryTransaction<'_> {
    fn deref_mut(&mut self) -> &mut Inventory {
        self.inventory
    }
}

impl Drop for InventoryTransaction<'_> {
    fn drop(&mut self) {
        // If not finalized, auto-rollback
        self.restore();
    }
}

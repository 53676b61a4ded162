//! # Economy Events
//!
//! State-change notifications for the presentation and storage layers.
//!
//! Observers are registered on the coordinator that owns the inventory and
//! are dropped with it. Events fire synchronously once the triggering
//! operation has finished mutating state, so every observer sees the final
//! inventory.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::consumable::Consumable;
use crate::cooldown::Tier;
use crate::inventory::Inventory;
use crate::reward::RewardBundle;

/// Economy event for observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EconomyEvent {
    /// The session's inventory is loaded and ready.
    InventoryInitialized,
    /// Balances, counters or container state changed.
    InventoryChanged,
    /// A container was purchased.
    ContainerBought(Tier),
    /// A tier became purchasable again.
    ContainerBecameAvailable(Tier),
    /// A container was opened.
    ContainerOpened {
        /// The tier that was opened.
        tier: Tier,
        /// What it granted.
        bundle: RewardBundle,
    },
    /// A consumable was used; the gameplay layer applies its effect.
    ConsumableUsed(Consumable),
}

impl EconomyEvent {
    /// Returns true if the inventory's serialized form may have changed.
    #[must_use]
    pub const fn mutates_inventory(&self) -> bool {
        matches!(
            self,
            Self::InventoryInitialized | Self::InventoryChanged | Self::ContainerBecameAvailable(_)
        )
    }
}

/// Receives economy events.
pub trait EconomyObserver: Send + Sync {
    /// Called once per event, after the operation completed.
    fn on_event(&self, event: &EconomyEvent, inventory: &Inventory);
}

/// Handle returned by [`ObserverRegistry::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observers of one coordinator.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn EconomyObserver>)>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn subscribe(&mut self, observer: Arc<dyn EconomyObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Delivers events in order to every observer.
    pub fn notify(&self, events: &[EconomyEvent], inventory: &Inventory) {
        for event in events {
            for (_, observer) in &self.observers {
                observer.on_event(event, inventory);
            }
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Observer that queues events for polling.
///
/// The presentation layer drains it once per frame.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Mutex<Vec<EconomyEvent>>,
}

impl EventBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<EconomyEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Peeks at pending event count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EconomyObserver for EventBuffer {
    fn on_event(&self, event: &EconomyEvent, _inventory: &Inventory) {
        self.events.lock().push(event.clone());
    }
}

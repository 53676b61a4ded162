//! # Inventory
//!
//! The aggregate root for one player: currency ledger, consumable counters and
//! one [`TierState`] per container tier.
//!
//! Callers only ever get shared references. Every mutation goes through the
//! crate's ledger, cooldown gate and coordinator paths.
//!
//! ## Wire Format
//!
//! ```text
//! {
//!   "userId": "a1B2c3D4e5",
//!   "headstarts": { "LongDash": 2, "DoubleMultiplier": 0 },
//!   "powerups":   { "Bicycle": 0, "Skates": 1, "Motorcycle": 0 },
//!   "currencies": { "Coins": 10000, "Gems": 45 },
//!   "containers": {
//!     "Silver": { "tier": "Silver", "count": 1,
//!                 "lastSpawnedAt": "1970-01-01T00:00:00Z",
//!                 "lastBoughtAt": "2024-05-01T12:00:00Z" },
//!     ...
//!   }
//! }
//! ```
//!
//! Timestamps are RFC 3339 UTC. Absent timestamps load as the Unix epoch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::consumable::{Consumable, HeadstartKind, PowerupKind};
use crate::cooldown::{Tier, TierState};
use crate::currency::{Currency, CurrencyLedger};
use crate::error::{EconomyError, EconomyResult};
use crate::reward::RewardBundle;

/// Soft currency granted to a new player.
pub const STARTING_COINS: u32 = 10_000;

/// Premium currency granted to a new player.
pub const STARTING_GEMS: u32 = 45;

/// One player's economy state.
///
/// Every tier, currency and consumable kind always has an entry. Deserializing
/// goes through [`InventoryRecord`], so a loaded inventory is always
/// normalized and validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "InventoryRecord")]
pub struct Inventory {
    /// Opaque player identifier.
    user_id: String,
    /// Headstart counters.
    headstarts: BTreeMap<HeadstartKind, u32>,
    /// Powerup counters.
    powerups: BTreeMap<PowerupKind, u32>,
    /// Currency balances.
    currencies: CurrencyLedger,
    /// Container state per tier.
    containers: BTreeMap<Tier, TierState>,
}

/// Wire form of an [`Inventory`] before defaults and invariants are applied.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryRecord {
    user_id: String,
    #[serde(default)]
    headstarts: BTreeMap<HeadstartKind, u32>,
    #[serde(default)]
    powerups: BTreeMap<PowerupKind, u32>,
    #[serde(default)]
    currencies: CurrencyLedger,
    #[serde(default)]
    containers: BTreeMap<Tier, TierState>,
}

impl TryFrom<InventoryRecord> for Inventory {
    type Error = EconomyError;

    fn try_from(record: InventoryRecord) -> EconomyResult<Self> {
        let mut inventory = Self {
            user_id: record.user_id,
            headstarts: record.headstarts,
            powerups: record.powerups,
            currencies: record.currencies,
            containers: record.containers,
        };
        inventory.normalize();
        inventory.validate()?;
        Ok(inventory)
    }
}

impl Inventory {
    /// Creates the default inventory for a new player.
    ///
    /// Starting balances, no consumables, no containers, every cooldown expired.
    #[must_use]
    pub fn new_player(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            headstarts: HeadstartKind::ALL.iter().map(|&k| (k, 0)).collect(),
            powerups: PowerupKind::ALL.iter().map(|&k| (k, 0)).collect(),
            currencies: CurrencyLedger::with_balances(&[
                (Currency::Coins, STARTING_COINS),
                (Currency::Gems, STARTING_GEMS),
            ]),
            containers: Tier::ALL.iter().map(|&t| (t, TierState::new(t))).collect(),
        }
    }

    /// Rebuilds an inventory from a serialized snapshot.
    ///
    /// Missing kinds and tiers are filled with defaults.
    ///
    /// # Errors
    ///
    /// Returns `DeserializationFailure` if the JSON is malformed or violates an
    /// invariant (e.g. more containers than a tier can store).
    pub fn from_json(json: &str) -> EconomyResult<Self> {
        serde_json::from_str(json).map_err(|e| EconomyError::DeserializationFailure(e.to_string()))
    }

    /// Serializes the inventory snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if serialization fails.
    pub fn to_json(&self) -> EconomyResult<String> {
        serde_json::to_string(self).map_err(|e| EconomyError::Persistence(e.to_string()))
    }

    /// The player identifier.
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The currency ledger.
    #[inline]
    #[must_use]
    pub fn currencies(&self) -> &CurrencyLedger {
        &self.currencies
    }

    /// Balance of one currency.
    #[inline]
    #[must_use]
    pub fn balance(&self, currency: Currency) -> u32 {
        self.currencies.balance(currency)
    }

    /// Held count of a headstart kind.
    #[must_use]
    pub fn headstarts(&self, kind: HeadstartKind) -> u32 {
        self.headstarts.get(&kind).copied().unwrap_or(0)
    }

    /// Held count of a powerup kind.
    #[must_use]
    pub fn powerups(&self, kind: PowerupKind) -> u32 {
        self.powerups.get(&kind).copied().unwrap_or(0)
    }

    /// Held count of any consumable.
    #[must_use]
    pub fn consumable_count(&self, consumable: Consumable) -> u32 {
        match consumable {
            Consumable::Headstart(kind) => self.headstarts(kind),
            Consumable::Powerup(kind) => self.powerups(kind),
        }
    }

    /// Container state of a tier.
    #[must_use]
    pub fn tier(&self, tier: Tier) -> &TierState {
        // Every constructor and loader fills all tiers.
        &self.containers[&tier]
    }

    /// Unopened containers held for a tier.
    #[inline]
    #[must_use]
    pub fn container_count(&self, tier: Tier) -> u32 {
        self.tier(tier).count()
    }

    pub(crate) fn currencies_mut(&mut self) -> &mut CurrencyLedger {
        &mut self.currencies
    }

    pub(crate) fn tier_mut(&mut self, tier: Tier) -> &mut TierState {
        self.containers
            .entry(tier)
            .or_insert_with(|| TierState::new(tier))
    }

    /// Removes one consumable.
    ///
    /// # Errors
    ///
    /// Returns `NoConsumableHeld` if the count is zero.
    pub(crate) fn take_consumable(&mut self, consumable: Consumable) -> EconomyResult<()> {
        let slot = match consumable {
            Consumable::Headstart(kind) => self.headstarts.entry(kind).or_insert(0),
            Consumable::Powerup(kind) => self.powerups.entry(kind).or_insert(0),
        };
        if *slot == 0 {
            return Err(EconomyError::NoConsumableHeld { consumable });
        }
        *slot -= 1;
        Ok(())
    }

    /// Credits a whole reward bundle.
    ///
    /// Every entry is checked before anything is written, so either the full
    /// bundle lands or the inventory is untouched.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyOverflow` or `ConsumableOverflow` if any counter would
    /// exceed `u32::MAX`.
    pub(crate) fn apply_bundle(&mut self, bundle: &RewardBundle) -> EconomyResult<()> {
        for (&currency, &amount) in &bundle.currencies {
            if !self.currencies.can_add(currency, amount) {
                return Err(EconomyError::CurrencyOverflow {
                    currency,
                    balance: self.currencies.balance(currency),
                    amount,
                });
            }
        }
        let headstarts = bundle
            .headstarts
            .iter()
            .map(|(&k, &a)| (Consumable::Headstart(k), a));
        let powerups = bundle
            .powerups
            .iter()
            .map(|(&k, &a)| (Consumable::Powerup(k), a));
        for (consumable, amount) in headstarts.chain(powerups) {
            let held = self.consumable_count(consumable);
            if held.checked_add(amount).is_none() {
                return Err(EconomyError::ConsumableOverflow {
                    consumable,
                    held,
                    amount,
                });
            }
        }

        for (&currency, &amount) in &bundle.currencies {
            self.currencies.add(currency, amount)?;
        }
        for (&kind, &amount) in &bundle.headstarts {
            *self.headstarts.entry(kind).or_insert(0) += amount;
        }
        for (&kind, &amount) in &bundle.powerups {
            *self.powerups.entry(kind).or_insert(0) += amount;
        }
        Ok(())
    }

    /// Creates a snapshot of the inventory for rollback.
    #[must_use]
    pub(crate) fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            state: self.clone(),
        }
    }

    /// Restores inventory from a snapshot (rollback).
    pub(crate) fn restore(&mut self, snapshot: InventorySnapshot) {
        *self = snapshot.state;
    }

    fn normalize(&mut self) {
        for kind in HeadstartKind::ALL {
            self.headstarts.entry(kind).or_insert(0);
        }
        for kind in PowerupKind::ALL {
            self.powerups.entry(kind).or_insert(0);
        }
        self.currencies.fill_missing();
        for tier in Tier::ALL {
            self.containers
                .entry(tier)
                .or_insert_with(|| TierState::new(tier));
        }
    }

    fn validate(&self) -> EconomyResult<()> {
        for (&tier, state) in &self.containers {
            state.validate(tier)?;
        }
        Ok(())
    }
}

/// Snapshot of inventory state for transactional rollback.
#[derive(Clone, Debug)]
pub(crate) struct InventorySnapshot {
    state: Inventory,
}

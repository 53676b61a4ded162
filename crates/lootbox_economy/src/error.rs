//! # Economy Error Types
//!
//! All errors that can occur in the economy system.
//!
//! Validation failures (funds, cooldown, storage, empty) are expected outcomes
//! returned to the caller. Nothing in this crate treats them as fatal.

use chrono::Duration;
use thiserror::Error;

use crate::consumable::Consumable;
use crate::cooldown::Tier;
use crate::currency::Currency;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Balance is lower than the amount being spent.
    #[error("insufficient funds: need {required} {currency}, have {available}")]
    InsufficientFunds {
        /// The currency being spent.
        currency: Currency,
        /// The amount required.
        required: u32,
        /// The balance available.
        available: u32,
    },

    /// The tier was purchased too recently.
    #[error("{tier} container on cooldown for another {}s", .remaining.num_seconds())]
    CooldownActive {
        /// The tier that is cooling down.
        tier: Tier,
        /// Time left until the next purchase is allowed.
        remaining: Duration,
    },

    /// The player already holds the maximum number of containers for the tier.
    #[error("{tier} storage full: limit {limit}, open a few containers first")]
    StorageFull {
        /// The tier whose storage is full.
        tier: Tier,
        /// The storage limit of the tier.
        limit: u32,
    },

    /// Tried to open a container of a tier the player holds none of.
    #[error("no {tier} containers held")]
    EmptyStorage {
        /// The tier that was empty.
        tier: Tier,
    },

    /// Tried to expedite a tier that is not cooling down.
    #[error("{tier} container is not on cooldown")]
    NotOnCooldown {
        /// The tier that was already purchasable.
        tier: Tier,
    },

    /// Tried to use a consumable the player holds none of.
    #[error("no {consumable} held")]
    NoConsumableHeld {
        /// The consumable that was requested.
        consumable: Consumable,
    },

    /// Adding to a balance would exceed the representable maximum.
    #[error("currency overflow: {currency} balance {balance} cannot take {amount} more")]
    CurrencyOverflow {
        /// The currency being credited.
        currency: Currency,
        /// The balance before the add.
        balance: u32,
        /// The amount that was rejected.
        amount: u32,
    },

    /// Adding to a consumable counter would exceed the representable maximum.
    #[error("consumable overflow: {consumable} count {held} cannot take {amount} more")]
    ConsumableOverflow {
        /// The consumable being credited.
        consumable: Consumable,
        /// The count before the add.
        held: u32,
        /// The amount that was rejected.
        amount: u32,
    },

    /// The advertisement did not complete.
    #[error("ad watch failed: {0}")]
    AdWatchFailed(String),

    /// A serialized inventory snapshot could not be read.
    #[error("could not deserialize inventory: {0}")]
    DeserializationFailure(String),

    /// An unknown tier, currency or consumable name.
    #[error("invalid tier or kind: {0}")]
    InvalidTierOrKind(String),

    /// Save slot or remote fetch I/O failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;

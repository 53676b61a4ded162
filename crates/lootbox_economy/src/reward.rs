//! # Reward Generator
//!
//! **Fixed per-tier probability tables**
//!
//! Opening a container rolls a [`RewardBundle`] from the tier's table. The
//! generator is a pure function of the tier and the random stream it is
//! handed: pass a seeded `ChaCha8Rng` and the bundle is reproducible.
//!
//! ## Tables
//!
//! All integer ranges are lower-inclusive, upper-exclusive. Draws are uniform
//! in `[0, 1)` unless noted.
//!
//! ```text
//! Bronze  p <  0.40 -> LongDash          1..2
//!         p <  0.70 -> DoubleMultiplier  1..2
//!         else      -> random powerup    1..3
//!         always    -> Coins             100..1000
//!
//! Silver  coin flip A -> Gems 5..10, then q in [0, 0.5):
//!                          q < 0.25 -> LongDash          2..5
//!                          q < 0.35 -> DoubleMultiplier  2..5
//!                          else     -> random powerup    3..5
//!         coin flip B -> q in [0, 0.35):
//!                          q < 0.25 -> LongDash          2..5
//!                          else     -> DoubleMultiplier  2..5
//!                        plus random powerup             3..5
//!         always      -> Coins 1000..5000
//!
//! Gold    random headstart 5..7, random powerup 5..8,
//!         Coins 5000..10000, Gems 15..20
//! ```
//!
//! Every range starts at 1 or more, so a bundle is never empty and never
//! carries a zero amount.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::consumable::{HeadstartKind, PowerupKind};
use crate::cooldown::Tier;
use crate::currency::Currency;

/// Everything granted by opening one container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBundle {
    /// Currency grants.
    pub currencies: BTreeMap<Currency, u32>,
    /// Headstart grants.
    pub headstarts: BTreeMap<HeadstartKind, u32>,
    /// Powerup grants.
    pub powerups: BTreeMap<PowerupKind, u32>,
}

impl RewardBundle {
    /// Amount of a currency in the bundle (0 if absent).
    #[inline]
    #[must_use]
    pub fn currency(&self, currency: Currency) -> u32 {
        self.currencies.get(&currency).copied().unwrap_or(0)
    }

    /// Amount of a headstart in the bundle (0 if absent).
    #[inline]
    #[must_use]
    pub fn headstart(&self, kind: HeadstartKind) -> u32 {
        self.headstarts.get(&kind).copied().unwrap_or(0)
    }

    /// Amount of a powerup in the bundle (0 if absent).
    #[inline]
    #[must_use]
    pub fn powerup(&self, kind: PowerupKind) -> u32 {
        self.powerups.get(&kind).copied().unwrap_or(0)
    }

    /// Returns true if the bundle grants nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty() && self.headstarts.is_empty() && self.powerups.is_empty()
    }

    fn grant_currency(&mut self, currency: Currency, amount: u32) {
        *self.currencies.entry(currency).or_insert(0) += amount;
    }

    fn grant_headstart(&mut self, kind: HeadstartKind, amount: u32) {
        *self.headstarts.entry(kind).or_insert(0) += amount;
    }

    fn grant_powerup(&mut self, kind: PowerupKind, amount: u32) {
        *self.powerups.entry(kind).or_insert(0) += amount;
    }
}

/// Rolls reward bundles from the fixed tier tables.
///
/// Stateless; the randomness source is always supplied by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct RewardGenerator;

impl RewardGenerator {
    /// Rolls one bundle for `tier`.
    pub fn generate<R: Rng + ?Sized>(tier: Tier, rng: &mut R) -> RewardBundle {
        let mut bundle = RewardBundle::default();
        match tier {
            Tier::Bronze => Self::roll_bronze(&mut bundle, rng),
            Tier::Silver => Self::roll_silver(&mut bundle, rng),
            Tier::Gold => Self::roll_gold(&mut bundle, rng),
        }
        bundle
    }

    fn roll_bronze<R: Rng + ?Sized>(bundle: &mut RewardBundle, rng: &mut R) {
        let p: f64 = rng.gen();
        if p < 0.40 {
            bundle.grant_headstart(HeadstartKind::LongDash, rng.gen_range(1..2));
        } else if p < 0.70 {
            bundle.grant_headstart(HeadstartKind::DoubleMultiplier, rng.gen_range(1..2));
        } else {
            let kind = pick(rng, &PowerupKind::ALL);
            bundle.grant_powerup(kind, rng.gen_range(1..3));
        }
        bundle.grant_currency(Currency::Coins, rng.gen_range(100..1000));
    }

    fn roll_silver<R: Rng + ?Sized>(bundle: &mut RewardBundle, rng: &mut R) {
        if rng.gen_bool(0.5) {
            bundle.grant_currency(Currency::Gems, rng.gen_range(5..10));
            let q: f64 = rng.gen_range(0.0..0.5);
            if q < 0.25 {
                bundle.grant_headstart(HeadstartKind::LongDash, rng.gen_range(2..5));
            } else if q < 0.35 {
                bundle.grant_headstart(HeadstartKind::DoubleMultiplier, rng.gen_range(2..5));
            } else {
                let kind = pick(rng, &PowerupKind::ALL);
                bundle.grant_powerup(kind, rng.gen_range(3..5));
            }
        } else {
            let q: f64 = rng.gen_range(0.0..0.35);
            if q < 0.25 {
                bundle.grant_headstart(HeadstartKind::LongDash, rng.gen_range(2..5));
            } else {
                bundle.grant_headstart(HeadstartKind::DoubleMultiplier, rng.gen_range(2..5));
            }
            let kind = pick(rng, &PowerupKind::ALL);
            bundle.grant_powerup(kind, rng.gen_range(3..5));
        }
        bundle.grant_currency(Currency::Coins, rng.gen_range(1000..5000));
    }

    fn roll_gold<R: Rng + ?Sized>(bundle: &mut RewardBundle, rng: &mut R) {
        let headstart = pick(rng, &HeadstartKind::ALL);
        bundle.grant_headstart(headstart, rng.gen_range(5..7));
        let powerup = pick(rng, &PowerupKind::ALL);
        bundle.grant_powerup(powerup, rng.gen_range(5..8));
        bundle.grant_currency(Currency::Coins, rng.gen_range(5000..10000));
        bundle.grant_currency(Currency::Gems, rng.gen_range(15..20));
    }
}

/// Uniform choice from a non-empty table.
fn pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}

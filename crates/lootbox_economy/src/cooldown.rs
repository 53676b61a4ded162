//! # Cooldown Gate
//!
//! Per-tier container state and the purchase/open state machine.
//!
//! ## State Machine
//!
//! ```text
//!   held count:   Empty ──purchase──> Held ──open (count == 1)──> Empty
//!                                     Held ──purchase / open────> Held
//!
//!   cooldown:     Ready ──purchase──> Cooling ──time elapses──> Ready
//!                                     Cooling ──expedite──────> Ready
//! ```
//!
//! The two sub-states are independent. Cooldown expiry is never scheduled:
//! it is computed lazily from the stored purchase timestamp whenever
//! eligibility is asked for.
//!
//! ## Tier Rules
//!
//! | Tier   | Cooldown | Storage   | Price      | Expedite |
//! |--------|----------|-----------|------------|----------|
//! | Bronze | 6h       | unlimited | 1 ad watch | free     |
//! | Silver | 3h       | 3         | 5000 Coins | 25 Coins |
//! | Gold   | none     | unlimited | 15 Gems    | free     |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::currency::{Cost, Currency};
use crate::error::{EconomyError, EconomyResult};

/// The "never" timestamp: the Unix epoch.
#[inline]
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Reward container tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    /// Ad-gated, long cooldown.
    Bronze = 0,
    /// Coin-priced, capped storage.
    Silver = 1,
    /// Gem-priced, no cooldown.
    Gold = 2,
}

impl Tier {
    /// Every tier, cheapest first.
    pub const ALL: [Self; 3] = [Self::Bronze, Self::Silver, Self::Gold];

    /// Minimum time between two purchases of this tier.
    #[must_use]
    pub fn cooldown(self) -> Duration {
        match self {
            Self::Bronze => Duration::hours(6),
            Self::Silver => Duration::hours(3),
            Self::Gold => Duration::zero(),
        }
    }

    /// Maximum unopened containers held at once (`None` = unlimited).
    #[inline]
    #[must_use]
    pub const fn storage_limit(self) -> Option<u32> {
        match self {
            Self::Bronze | Self::Gold => None,
            Self::Silver => Some(3),
        }
    }

    /// Price of one container.
    #[inline]
    #[must_use]
    pub const fn purchase_cost(self) -> Cost {
        match self {
            Self::Bronze => Cost::AdWatch,
            Self::Silver => Cost::currency(Currency::Coins, 5000),
            Self::Gold => Cost::currency(Currency::Gems, 15),
        }
    }

    /// Price of clearing an active cooldown.
    #[inline]
    #[must_use]
    pub const fn expedite_price(self) -> (Currency, u32) {
        match self {
            Self::Bronze | Self::Gold => (Currency::Coins, 0),
            Self::Silver => (Currency::Coins, 25),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bronze => f.write_str("Bronze"),
            Self::Silver => f.write_str("Silver"),
            Self::Gold => f.write_str("Gold"),
        }
    }
}

impl FromStr for Tier {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            _ => Err(EconomyError::InvalidTierOrKind(format!("unknown tier '{s}'"))),
        }
    }
}

/// Container state for one tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierState {
    /// The tier this state belongs to.
    tier: Tier,
    /// Unopened containers held.
    count: u32,
    /// When the tier last became purchasable.
    #[serde(default = "epoch")]
    last_spawned_at: DateTime<Utc>,
    /// When the tier was last purchased.
    #[serde(default = "epoch")]
    last_bought_at: DateTime<Utc>,
}

impl TierState {
    /// Fresh state: nothing held, never bought, never spawned.
    #[must_use]
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            count: 0,
            last_spawned_at: epoch(),
            last_bought_at: epoch(),
        }
    }

    /// The tier.
    #[inline]
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Unopened containers held.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Timestamp of the last successful purchase.
    #[inline]
    #[must_use]
    pub const fn last_bought_at(&self) -> DateTime<Utc> {
        self.last_bought_at
    }

    /// Timestamp of the last spawn (became-available) event.
    #[inline]
    #[must_use]
    pub const fn last_spawned_at(&self) -> DateTime<Utc> {
        self.last_spawned_at
    }

    /// Whether the purchase cooldown is still running at `now`.
    ///
    /// A purchase stamped after `now` keeps the tier cooling until a full
    /// cooldown past that stamp.
    #[must_use]
    pub fn is_cooling(&self, now: DateTime<Utc>) -> bool {
        self.remaining_cooldown(now) > Duration::zero()
    }

    /// Time left until the cooldown ends (zero when ready).
    ///
    /// `cooldown - (now - last_bought_at)`, floored at zero. Tiers without a
    /// cooldown are always ready.
    #[must_use]
    pub fn remaining_cooldown(&self, now: DateTime<Utc>) -> Duration {
        let cooldown = self.tier.cooldown();
        if cooldown.is_zero() {
            return Duration::zero();
        }
        (cooldown - (now - self.last_bought_at)).max(Duration::zero())
    }

    /// Whether another container fits in storage.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.tier.storage_limit().map_or(self.count < u32::MAX, |limit| self.count < limit)
    }

    /// Checks purchase eligibility at `now`.
    ///
    /// # Errors
    ///
    /// - `CooldownActive` with the remaining wait if the tier is cooling down
    /// - `StorageFull` if the tier's storage limit is reached
    pub fn can_purchase(&self, now: DateTime<Utc>) -> EconomyResult<()> {
        if self.is_cooling(now) {
            return Err(EconomyError::CooldownActive {
                tier: self.tier,
                remaining: self.remaining_cooldown(now),
            });
        }
        if !self.has_room() {
            return Err(EconomyError::StorageFull {
                tier: self.tier,
                limit: self.tier.storage_limit().unwrap_or(u32::MAX),
            });
        }
        Ok(())
    }

    /// Records a purchase: starts the cooldown and adds one container.
    ///
    /// # Errors
    ///
    /// Same as [`Self::can_purchase`]; state is unchanged on error.
    pub fn record_purchase(&mut self, now: DateTime<Utc>) -> EconomyResult<()> {
        self.can_purchase(now)?;
        self.last_bought_at = now;
        self.count += 1;
        Ok(())
    }

    /// Clears an active cooldown by resetting the purchase time to epoch.
    ///
    /// # Errors
    ///
    /// Returns `NotOnCooldown` if the tier is already purchasable.
    pub fn expedite(&mut self, now: DateTime<Utc>) -> EconomyResult<()> {
        if !self.is_cooling(now) {
            return Err(EconomyError::NotOnCooldown { tier: self.tier });
        }
        self.last_bought_at = epoch();
        Ok(())
    }

    /// Removes one container from storage.
    ///
    /// # Errors
    ///
    /// Returns `EmptyStorage` if nothing is held.
    pub fn record_open(&mut self) -> EconomyResult<()> {
        if self.count == 0 {
            return Err(EconomyError::EmptyStorage { tier: self.tier });
        }
        self.count -= 1;
        Ok(())
    }

    /// Stamps the time the tier became purchasable.
    pub fn mark_spawned(&mut self, now: DateTime<Utc>) {
        self.last_spawned_at = now;
    }

    /// Checks invariants of a loaded state.
    pub(crate) fn validate(&self, expected: Tier) -> EconomyResult<()> {
        if self.tier != expected {
            return Err(EconomyError::DeserializationFailure(format!(
                "state for {} stored under {expected}",
                self.tier
            )));
        }
        if let Some(limit) = self.tier.storage_limit() {
            if self.count > limit {
                return Err(EconomyError::DeserializationFailure(format!(
                    "{} holds {} containers, limit is {limit}",
                    self.tier, self.count
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_state_is_purchasable() {
        for tier in Tier::ALL {
            let state = TierState::new(tier);
            assert!(state.can_purchase(t0()).is_ok());
            assert_eq!(state.remaining_cooldown(t0()), Duration::zero());
        }
    }

    #[test]
    fn test_purchase_starts_cooldown() {
        let mut state = TierState::new(Tier::Silver);
        state.record_purchase(t0()).unwrap();
        assert_eq!(state.count(), 1);
        assert_eq!(state.last_bought_at(), t0());

        let later = t0() + Duration::minutes(30);
        assert_eq!(
            state.can_purchase(later),
            Err(EconomyError::CooldownActive {
                tier: Tier::Silver,
                remaining: Duration::minutes(150),
            })
        );

        // Failed purchase leaves state alone
        assert!(state.record_purchase(later).is_err());
        assert_eq!(state.count(), 1);
        assert_eq!(state.last_bought_at(), t0());

        assert!(state.can_purchase(t0() + Duration::hours(3)).is_ok());
    }

    #[test]
    fn test_silver_storage_full() {
        let mut state = TierState::new(Tier::Silver);
        let mut now = t0();
        for _ in 0..3 {
            state.record_purchase(now).unwrap();
            now += Duration::hours(3);
        }
        assert_eq!(
            state.can_purchase(now),
            Err(EconomyError::StorageFull {
                tier: Tier::Silver,
                limit: 3,
            })
        );
    }

    #[test]
    fn test_gold_has_no_cooldown() {
        let mut state = TierState::new(Tier::Gold);
        for _ in 0..10 {
            state.record_purchase(t0()).unwrap();
        }
        assert_eq!(state.count(), 10);
        assert!(!state.is_cooling(t0()));
        assert_eq!(
            state.expedite(t0()),
            Err(EconomyError::NotOnCooldown { tier: Tier::Gold })
        );
    }

    #[test]
    fn test_expedite_clears_cooldown() {
        let mut state = TierState::new(Tier::Bronze);
        state.record_purchase(t0()).unwrap();
        assert!(state.is_cooling(t0() + Duration::hours(1)));

        state.expedite(t0() + Duration::hours(1)).unwrap();
        assert_eq!(state.last_bought_at(), epoch());
        assert!(state.can_purchase(t0() + Duration::hours(1)).is_ok());
        assert_eq!(state.count(), 1);
    }

    #[test]
    fn test_open_requires_container() {
        let mut state = TierState::new(Tier::Gold);
        assert_eq!(
            state.record_open(),
            Err(EconomyError::EmptyStorage { tier: Tier::Gold })
        );
        state.record_purchase(t0()).unwrap();
        state.record_open().unwrap();
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn test_open_then_rebuy_restores_count() {
        let mut state = TierState::new(Tier::Silver);
        state.record_purchase(t0()).unwrap();
        state.record_purchase(t0() + Duration::hours(3)).unwrap();
        let before = state.count();

        let now = t0() + Duration::hours(6);
        state.record_open().unwrap();
        state.record_purchase(now).unwrap();
        assert_eq!(state.count(), before);
    }

    #[test]
    fn test_clock_behind_purchase_counts_as_cooling() {
        let mut state = TierState::new(Tier::Silver);
        state.record_purchase(t0()).unwrap();
        let earlier = t0() - Duration::hours(1);
        assert!(state.is_cooling(earlier));
        assert_eq!(state.remaining_cooldown(earlier), Duration::hours(4));
    }

    #[test]
    fn test_waiting_reported_remaining_is_enough() {
        let mut state = TierState::new(Tier::Silver);
        // Stamped by a clock running an hour ahead
        state.last_bought_at = t0() + Duration::hours(1);

        let remaining = state.remaining_cooldown(t0());
        assert_eq!(remaining, Duration::hours(4));
        assert_eq!(
            state.can_purchase(t0()),
            Err(EconomyError::CooldownActive {
                tier: Tier::Silver,
                remaining: Duration::hours(4),
            })
        );
        assert!(state.can_purchase(t0() + remaining - Duration::seconds(1)).is_err());
        assert!(state.can_purchase(t0() + remaining).is_ok());
    }

    #[test]
    fn test_gold_ignores_future_stamp() {
        let mut state = TierState::new(Tier::Gold);
        state.last_bought_at = t0() + Duration::hours(1);
        assert_eq!(state.remaining_cooldown(t0()), Duration::zero());
        assert!(state.can_purchase(t0()).is_ok());
    }

    #[test]
    fn test_can_purchase_matches_definition() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..2000 {
            let tier = Tier::ALL[rng.gen_range(0..3)];
            let mut state = TierState::new(tier);
            state.count = rng.gen_range(0..5);
            state.last_bought_at = t0() + Duration::minutes(rng.gen_range(-600..600));
            let now = t0() + Duration::minutes(rng.gen_range(-600..600));

            let cooled = (now - state.last_bought_at).max(Duration::zero()) >= tier.cooldown();
            let room = tier.storage_limit().map_or(true, |limit| state.count < limit);
            assert_eq!(state.can_purchase(now).is_ok(), cooled && room);
        }
    }

    #[test]
    fn test_validate_rejects_overfull_storage() {
        let mut state = TierState::new(Tier::Silver);
        state.count = 4;
        assert!(matches!(
            state.validate(Tier::Silver),
            Err(EconomyError::DeserializationFailure(_))
        ));
        assert!(TierState::new(Tier::Gold).validate(Tier::Silver).is_err());
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!("Silver".parse::<Tier>().unwrap(), Tier::Silver);
        assert!(matches!(
            "platinum".parse::<Tier>(),
            Err(EconomyError::InvalidTierOrKind(_))
        ));
    }
}

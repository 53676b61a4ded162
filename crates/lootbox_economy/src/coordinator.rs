//! # Transaction Coordinator
//!
//! Connects the inventory to its callers: every mutating economy operation
//! for one player goes through here.
//!
//! ## The Purchase Pipeline
//!
//! ```text
//! buy_container(tier)
//!   ad-gated:     can_purchase -> watch ad (await) -> record_purchase
//!   currency:     balance check -> begin txn -> record_purchase -> spend -> commit
//!   then:         ContainerBought, InventoryChanged, availability refresh
//!
//! open_container(tier)
//!   begin txn -> record_open -> generate bundle -> apply bundle -> commit
//!   then:         ContainerOpened, InventoryChanged, availability refresh
//! ```
//!
//! Operations take `&mut self`, so a coordinator is single-writer by
//! construction. Sharing one across tasks goes through
//! [`SessionRegistry`](crate::session::SessionRegistry).
//!
//! Every failing operation leaves the inventory untouched and emits nothing.

use chrono::Duration;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ads::AdProvider;
use crate::clock::{Clock, SystemClock};
use crate::consumable::Consumable;
use crate::cooldown::Tier;
use crate::currency::{Cost, Currency};
use crate::error::{EconomyError, EconomyResult};
use crate::events::{EconomyEvent, EconomyObserver, ObserverId, ObserverRegistry};
use crate::inventory::Inventory;
use crate::reward::{RewardBundle, RewardGenerator};
use crate::transaction::InventoryTransaction;

/// Owns one player's inventory and runs every operation on it.
pub struct TransactionCoordinator {
    /// The aggregate being mutated.
    inventory: Inventory,
    /// Listeners torn down with the coordinator.
    observers: ObserverRegistry,
    /// Time source for cooldowns.
    clock: Arc<dyn Clock>,
    /// Plays ads for ad-gated tiers.
    ads: Arc<dyn AdProvider>,
    /// Sole randomness source for reward rolls.
    rng: ChaCha20Rng,
    /// Last announced purchasability per tier.
    announced: BTreeMap<Tier, bool>,
}

impl TransactionCoordinator {
    /// Creates a coordinator with explicit collaborators.
    ///
    /// Tiers purchasable right now count as already announced; call
    /// [`initialize`](Self::initialize) once observers are attached to
    /// announce them.
    #[must_use]
    pub fn new(
        inventory: Inventory,
        clock: Arc<dyn Clock>,
        ads: Arc<dyn AdProvider>,
        rng: ChaCha20Rng,
    ) -> Self {
        let now = clock.now();
        let announced = Tier::ALL
            .iter()
            .map(|&tier| (tier, inventory.tier(tier).can_purchase(now).is_ok()))
            .collect();
        Self {
            inventory,
            observers: ObserverRegistry::new(),
            clock,
            ads,
            rng,
            announced,
        }
    }

    /// Creates a coordinator on the system clock.
    ///
    /// Rewards are seeded from `seed` when given, from OS entropy otherwise.
    #[must_use]
    pub fn with_system_clock(
        inventory: Inventory,
        ads: Arc<dyn AdProvider>,
        seed: Option<u64>,
    ) -> Self {
        let rng = seed.map_or_else(ChaCha20Rng::from_entropy, ChaCha20Rng::seed_from_u64);
        Self::new(inventory, Arc::new(SystemClock), ads, rng)
    }

    /// Announces the loaded inventory to observers.
    ///
    /// Emits `InventoryInitialized`, `InventoryChanged` and one
    /// `ContainerBecameAvailable` per purchasable tier.
    pub fn initialize(&mut self) {
        tracing::info!(
            user_id = self.inventory.user_id(),
            coins = self.inventory.balance(Currency::Coins),
            gems = self.inventory.balance(Currency::Gems),
            "inventory initialized"
        );
        self.announced.clear();
        self.finish(vec![
            EconomyEvent::InventoryInitialized,
            EconomyEvent::InventoryChanged,
        ]);
    }

    /// Read-only view of the inventory.
    #[inline]
    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Registers an observer.
    pub fn subscribe(&mut self, observer: Arc<dyn EconomyObserver>) -> ObserverId {
        self.observers.subscribe(observer)
    }

    /// Removes an observer.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Checks whether `tier` can be bought right now.
    ///
    /// # Errors
    ///
    /// `CooldownActive` or `StorageFull`, as for
    /// [`TierState::can_purchase`](crate::cooldown::TierState::can_purchase).
    pub fn can_purchase(&self, tier: Tier) -> EconomyResult<()> {
        self.inventory.tier(tier).can_purchase(self.clock.now())
    }

    /// Time left on the tier's cooldown (zero when ready).
    #[must_use]
    pub fn remaining_cooldown(&self, tier: Tier) -> Duration {
        self.inventory.tier(tier).remaining_cooldown(self.clock.now())
    }

    /// Buys one container of `tier`.
    ///
    /// Ad-gated tiers suspend while the ad plays. Nothing is mutated before
    /// the ad completes.
    ///
    /// # Errors
    ///
    /// - `InsufficientFunds` if the price cannot be paid
    /// - `CooldownActive` / `StorageFull` if the tier is not purchasable
    /// - `AdWatchFailed` if the ad did not complete
    pub async fn buy_container(&mut self, tier: Tier) -> EconomyResult<()> {
        match tier.purchase_cost() {
            Cost::AdWatch => {
                self.can_purchase(tier)?;
                if let Err(e) = self.ads.watch_ad().await {
                    tracing::warn!(
                        user_id = self.inventory.user_id(),
                        %tier,
                        error = %e,
                        "ad watch failed"
                    );
                    return Err(match e {
                        EconomyError::AdWatchFailed(_) => e,
                        other => EconomyError::AdWatchFailed(other.to_string()),
                    });
                }
                // Time moved while the ad played
                let now = self.clock.now();
                self.inventory.tier_mut(tier).record_purchase(now)?;
            }
            Cost::Currency { currency, units } => {
                let available = self.inventory.balance(currency);
                if available < units {
                    return Err(EconomyError::InsufficientFunds {
                        currency,
                        required: units,
                        available,
                    });
                }
                let now = self.clock.now();
                let mut txn = InventoryTransaction::begin(&mut self.inventory, "buy_container");
                txn.tier_mut(tier).record_purchase(now)?;
                txn.currencies_mut().spend(currency, units)?;
                txn.commit();
            }
        }

        tracing::info!(
            user_id = self.inventory.user_id(),
            %tier,
            held = self.inventory.container_count(tier),
            "container bought"
        );
        self.finish(vec![
            EconomyEvent::ContainerBought(tier),
            EconomyEvent::InventoryChanged,
        ]);
        Ok(())
    }

    /// Opens one held container of `tier` and credits its rewards.
    ///
    /// # Errors
    ///
    /// - `EmptyStorage` if none is held
    /// - `CurrencyOverflow` / `ConsumableOverflow` if the rewards do not fit;
    ///   the container stays unopened
    pub fn open_container(&mut self, tier: Tier) -> EconomyResult<RewardBundle> {
        let mut txn = InventoryTransaction::begin(&mut self.inventory, "open_container");
        txn.tier_mut(tier).record_open()?;
        let bundle = RewardGenerator::generate(tier, &mut self.rng);
        txn.apply_bundle(&bundle)?;
        txn.commit();

        tracing::info!(
            user_id = self.inventory.user_id(),
            %tier,
            coins = bundle.currency(Currency::Coins),
            gems = bundle.currency(Currency::Gems),
            "container opened"
        );
        self.finish(vec![
            EconomyEvent::ContainerOpened {
                tier,
                bundle: bundle.clone(),
            },
            EconomyEvent::InventoryChanged,
        ]);
        Ok(bundle)
    }

    /// Consumes one held consumable and triggers its effect.
    ///
    /// # Errors
    ///
    /// Returns `NoConsumableHeld` if the count is zero.
    pub fn use_consumable(&mut self, consumable: Consumable) -> EconomyResult<()> {
        self.inventory.take_consumable(consumable)?;
        consumable.activate();
        self.finish(vec![
            EconomyEvent::ConsumableUsed(consumable),
            EconomyEvent::InventoryChanged,
        ]);
        Ok(())
    }

    /// Pays to clear an active cooldown.
    ///
    /// # Errors
    ///
    /// - `NotOnCooldown` if the tier is already purchasable
    /// - `InsufficientFunds` if the expedite price cannot be paid
    pub fn expedite_cooldown(&mut self, tier: Tier) -> EconomyResult<()> {
        let now = self.clock.now();
        let (currency, units) = tier.expedite_price();

        let mut txn = InventoryTransaction::begin(&mut self.inventory, "expedite_cooldown");
        if !txn.tier(tier).is_cooling(now) {
            return Err(EconomyError::NotOnCooldown { tier });
        }
        txn.currencies_mut().spend(currency, units)?;
        txn.tier_mut(tier).expedite(now)?;
        txn.commit();

        tracing::info!(
            user_id = self.inventory.user_id(),
            %tier,
            paid = units,
            "cooldown expedited"
        );
        self.finish(vec![EconomyEvent::InventoryChanged]);
        Ok(())
    }

    /// Credits a currency balance.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyOverflow` if the balance would exceed `u32::MAX`.
    pub fn add_currency(&mut self, currency: Currency, amount: u32) -> EconomyResult<()> {
        self.inventory.currencies_mut().add(currency, amount)?;
        self.finish(vec![EconomyEvent::InventoryChanged]);
        Ok(())
    }

    /// Debits a currency balance.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the balance is too low.
    pub fn withdraw_currency(&mut self, currency: Currency, amount: u32) -> EconomyResult<()> {
        self.inventory.currencies_mut().spend(currency, amount)?;
        self.finish(vec![EconomyEvent::InventoryChanged]);
        Ok(())
    }

    /// Announces tiers that became purchasable since the last check.
    ///
    /// Meant to be polled; cooldowns expire without any internal timer.
    /// Returns the newly available tiers.
    pub fn refresh_availability(&mut self) -> Vec<Tier> {
        let events = self.collect_availability();
        let tiers = events
            .iter()
            .filter_map(|event| match event {
                EconomyEvent::ContainerBecameAvailable(tier) => Some(*tier),
                _ => None,
            })
            .collect();
        self.observers.notify(&events, &self.inventory);
        tiers
    }

    /// Serializes the inventory snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if serialization fails.
    pub fn to_json(&self) -> EconomyResult<String> {
        self.inventory.to_json()
    }

    /// Consumes the coordinator, returning the inventory.
    #[must_use]
    pub fn into_inventory(self) -> Inventory {
        self.inventory
    }

    fn collect_availability(&mut self) -> Vec<EconomyEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();
        for tier in Tier::ALL {
            let ready = self.inventory.tier(tier).can_purchase(now).is_ok();
            let was_ready = self.announced.insert(tier, ready).unwrap_or(false);
            if ready && !was_ready {
                self.inventory.tier_mut(tier).mark_spawned(now);
                tracing::debug!(user_id = self.inventory.user_id(), %tier, "container available");
                events.push(EconomyEvent::ContainerBecameAvailable(tier));
            }
        }
        events
    }

    fn finish(&mut self, mut events: Vec<EconomyEvent>) {
        events.extend(self.collect_availability());
        self.observers.notify(&events, &self.inventory);
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("user_id", &self.inventory.user_id())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::SimulatedAdProvider;
    use crate::clock::ManualClock;
    use crate::consumable::HeadstartKind;
    use crate::cooldown::epoch;
    use crate::events::EventBuffer;
    use chrono::{TimeZone, Utc};

    fn fixture(inventory: Inventory) -> (TransactionCoordinator, Arc<ManualClock>, Arc<EventBuffer>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        ));
        let mut coordinator = TransactionCoordinator::new(
            inventory,
            clock.clone(),
            Arc::new(SimulatedAdProvider::instant()),
            ChaCha20Rng::seed_from_u64(7),
        );
        let events = Arc::new(EventBuffer::new());
        coordinator.subscribe(events.clone());
        (coordinator, clock, events)
    }

    #[test]
    fn test_initialize_announces_every_tier() {
        let (mut c, _clock, events) = fixture(Inventory::new_player("p"));
        c.initialize();
        assert_eq!(
            events.drain(),
            vec![
                EconomyEvent::InventoryInitialized,
                EconomyEvent::InventoryChanged,
                EconomyEvent::ContainerBecameAvailable(Tier::Bronze),
                EconomyEvent::ContainerBecameAvailable(Tier::Silver),
                EconomyEvent::ContainerBecameAvailable(Tier::Gold),
            ]
        );
        assert_ne!(c.inventory().tier(Tier::Silver).last_spawned_at(), epoch());
    }

    #[tokio::test]
    async fn test_buy_silver() {
        let (mut c, _clock, events) = fixture(Inventory::new_player("p"));
        c.initialize();
        events.drain();

        c.buy_container(Tier::Silver).await.unwrap();
        assert_eq!(c.inventory().balance(Currency::Coins), 5_000);
        assert_eq!(c.inventory().container_count(Tier::Silver), 1);
        assert_eq!(c.remaining_cooldown(Tier::Silver), Duration::hours(3));
        assert_eq!(
            events.drain(),
            vec![
                EconomyEvent::ContainerBought(Tier::Silver),
                EconomyEvent::InventoryChanged,
            ]
        );
    }

    #[tokio::test]
    async fn test_buy_fails_without_funds() {
        let (mut c, _clock, events) = fixture(Inventory::new_player("p"));
        c.withdraw_currency(Currency::Gems, 40).unwrap();
        events.drain();
        let before = c.inventory().clone();

        let result = c.buy_container(Tier::Gold).await;
        assert_eq!(
            result,
            Err(EconomyError::InsufficientFunds {
                currency: Currency::Gems,
                required: 15,
                available: 5,
            })
        );
        assert_eq!(c.inventory(), &before);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_silver_storage_full() {
        let (mut c, clock, _events) = fixture(Inventory::new_player("p"));
        c.add_currency(Currency::Coins, 20_000).unwrap();
        for _ in 0..3 {
            c.buy_container(Tier::Silver).await.unwrap();
            clock.advance(Duration::hours(3));
        }
        let coins = c.inventory().balance(Currency::Coins);
        assert_eq!(
            c.buy_container(Tier::Silver).await,
            Err(EconomyError::StorageFull {
                tier: Tier::Silver,
                limit: 3
            })
        );
        assert_eq!(c.inventory().balance(Currency::Coins), coins);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_then_expires() {
        let (mut c, clock, _events) = fixture(Inventory::new_player("p"));
        c.buy_container(Tier::Bronze).await.unwrap();
        clock.advance(Duration::hours(5));
        assert!(matches!(
            c.buy_container(Tier::Bronze).await,
            Err(EconomyError::CooldownActive { tier: Tier::Bronze, .. })
        ));
        clock.advance(Duration::hours(1));
        c.buy_container(Tier::Bronze).await.unwrap();
        assert_eq!(c.inventory().container_count(Tier::Bronze), 2);
    }

    #[tokio::test]
    async fn test_failed_ad_changes_nothing() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut c = TransactionCoordinator::new(
            Inventory::new_player("p"),
            clock,
            Arc::new(SimulatedAdProvider::failing()),
            ChaCha20Rng::seed_from_u64(1),
        );
        let before = c.inventory().clone();
        assert!(matches!(
            c.buy_container(Tier::Bronze).await,
            Err(EconomyError::AdWatchFailed(_))
        ));
        assert_eq!(c.inventory(), &before);
    }

    #[tokio::test]
    async fn test_ineligible_ad_tier_skips_ad() {
        // A failing provider would turn any watched ad into AdWatchFailed
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut inv = Inventory::new_player("p");
        inv.tier_mut(Tier::Bronze).record_purchase(clock.now()).unwrap();
        let mut c = TransactionCoordinator::new(
            inv,
            clock,
            Arc::new(SimulatedAdProvider::failing()),
            ChaCha20Rng::seed_from_u64(1),
        );
        assert!(matches!(
            c.buy_container(Tier::Bronze).await,
            Err(EconomyError::CooldownActive { .. })
        ));
    }

    #[test]
    fn test_open_gold() {
        let (mut c, clock, events) = fixture(Inventory::new_player("p"));
        assert_eq!(
            c.open_container(Tier::Gold),
            Err(EconomyError::EmptyStorage { tier: Tier::Gold })
        );

        c.inventory.tier_mut(Tier::Gold).record_purchase(clock.now()).unwrap();
        events.drain();
        let bundle = c.open_container(Tier::Gold).unwrap();

        assert_eq!(c.inventory().container_count(Tier::Gold), 0);
        assert_eq!(bundle.headstarts.len(), 1);
        assert_eq!(bundle.powerups.len(), 1);
        assert!((5_000..10_000).contains(&bundle.currency(Currency::Coins)));
        assert!((15..20).contains(&bundle.currency(Currency::Gems)));
        assert_eq!(
            c.inventory().balance(Currency::Coins),
            10_000 + bundle.currency(Currency::Coins)
        );

        let drained = events.drain();
        assert_eq!(
            drained[0],
            EconomyEvent::ContainerOpened {
                tier: Tier::Gold,
                bundle
            }
        );
        assert_eq!(drained[1], EconomyEvent::InventoryChanged);
    }

    #[test]
    fn test_open_rolls_back_on_overflow() {
        let (mut c, clock, _events) = fixture(Inventory::new_player("p"));
        c.add_currency(Currency::Coins, u32::MAX - 10_000).unwrap();
        c.inventory.tier_mut(Tier::Gold).record_purchase(clock.now()).unwrap();
        let before = c.inventory().clone();

        assert!(matches!(
            c.open_container(Tier::Gold),
            Err(EconomyError::CurrencyOverflow { currency: Currency::Coins, .. })
        ));
        assert_eq!(c.inventory(), &before);
    }

    #[test]
    fn test_reopening_storage_announces_silver() {
        let (mut c, clock, events) = fixture(Inventory::new_player("p"));
        c.initialize();
        for _ in 0..3 {
            c.inventory.tier_mut(Tier::Silver).record_purchase(clock.now()).unwrap();
            clock.advance(Duration::hours(3));
        }
        assert!(c.refresh_availability().is_empty());
        assert!(matches!(
            c.can_purchase(Tier::Silver),
            Err(EconomyError::StorageFull { .. })
        ));
        events.drain();

        c.open_container(Tier::Silver).unwrap();
        assert!(events
            .drain()
            .contains(&EconomyEvent::ContainerBecameAvailable(Tier::Silver)));
    }

    #[tokio::test]
    async fn test_refresh_after_cooldown() {
        let (mut c, clock, events) = fixture(Inventory::new_player("p"));
        c.initialize();
        c.buy_container(Tier::Silver).await.unwrap();
        events.drain();

        assert!(c.refresh_availability().is_empty());
        clock.advance(Duration::hours(3));
        assert_eq!(c.refresh_availability(), vec![Tier::Silver]);
        assert_eq!(
            c.inventory().tier(Tier::Silver).last_spawned_at(),
            clock.now()
        );
        assert!(c.refresh_availability().is_empty());
        assert_eq!(
            events.drain(),
            vec![EconomyEvent::ContainerBecameAvailable(Tier::Silver)]
        );
    }

    #[test]
    fn test_use_consumable() {
        let (mut c, _clock, events) = fixture(Inventory::new_player("p"));
        let dash = Consumable::Headstart(HeadstartKind::LongDash);
        assert_eq!(
            c.use_consumable(dash),
            Err(EconomyError::NoConsumableHeld { consumable: dash })
        );

        let mut bundle = RewardBundle::default();
        bundle.headstarts.insert(HeadstartKind::LongDash, 1);
        c.inventory.apply_bundle(&bundle).unwrap();
        events.drain();

        c.use_consumable(dash).unwrap();
        assert_eq!(c.inventory().consumable_count(dash), 0);
        assert_eq!(
            events.drain(),
            vec![
                EconomyEvent::ConsumableUsed(dash),
                EconomyEvent::InventoryChanged
            ]
        );
    }

    #[test]
    fn test_uninitialized_ops_do_not_announce_ready_tiers() {
        let (mut c, _clock, events) = fixture(Inventory::new_player("p"));
        c.add_currency(Currency::Coins, 1).unwrap();

        assert_eq!(events.drain(), vec![EconomyEvent::InventoryChanged]);
        assert!(c.refresh_availability().is_empty());
        for tier in Tier::ALL {
            assert_eq!(c.inventory().tier(tier).last_spawned_at(), epoch());
        }
    }

    #[tokio::test]
    async fn test_expedite_silver() {
        let (mut c, _clock, _events) = fixture(Inventory::new_player("p"));
        assert_eq!(
            c.expedite_cooldown(Tier::Silver),
            Err(EconomyError::NotOnCooldown { tier: Tier::Silver })
        );

        c.buy_container(Tier::Silver).await.unwrap();
        c.expedite_cooldown(Tier::Silver).unwrap();
        assert_eq!(c.inventory().balance(Currency::Coins), 4_975);
        assert!(c.can_purchase(Tier::Silver).is_ok());
        assert_eq!(c.inventory().tier(Tier::Silver).last_bought_at(), epoch());
    }

    #[tokio::test]
    async fn test_expedite_without_funds_changes_nothing() {
        let (mut c, _clock, _events) = fixture(Inventory::new_player("p"));
        c.buy_container(Tier::Silver).await.unwrap();
        c.withdraw_currency(Currency::Coins, 4_990).unwrap();
        let before = c.inventory().clone();

        assert!(matches!(
            c.expedite_cooldown(Tier::Silver),
            Err(EconomyError::InsufficientFunds { .. })
        ));
        assert_eq!(c.inventory(), &before);
    }

    #[test]
    fn test_withdraw_insufficient() {
        let (mut c, _clock, events) = fixture(Inventory::new_player("p"));
        c.withdraw_currency(Currency::Coins, 9_950).unwrap();
        events.drain();
        assert!(matches!(
            c.withdraw_currency(Currency::Coins, 100),
            Err(EconomyError::InsufficientFunds { available: 50, .. })
        ));
        assert_eq!(c.inventory().balance(Currency::Coins), 50);
        assert!(events.is_empty());
    }
}

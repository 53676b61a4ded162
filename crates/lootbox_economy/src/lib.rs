//! # Lootbox Economy
//!
//! Pure Rust economy core for reward containers ("lootboxes").
//!
//! ## Design Principles
//!
//! 1. **No partial state** - every failing operation leaves the inventory untouched
//! 2. **Explicit randomness** - reward rolls take the RNG as an input
//! 3. **Lazy cooldowns** - expiry is computed from timestamps, never scheduled
//! 4. **Single writer per player** - operations take `&mut self`; shared access
//!    goes through a per-player async lock
//!
//! ## Module Map
//!
//! | Module          | Role                                              |
//! |-----------------|---------------------------------------------------|
//! | [`currency`]    | Overflow/underflow-safe balances                  |
//! | [`cooldown`]    | Per-tier cooldown and storage rules               |
//! | [`reward`]      | Per-tier reward tables                            |
//! | [`inventory`]   | Aggregate root and JSON snapshot                  |
//! | [`coordinator`] | Buy/open/use/expedite with rollback and events    |
//! | [`session`]     | Bootstrap and per-player session table            |
//!
//! ## Example
//!
//! ```rust,ignore
//! use lootbox_economy::{Inventory, SimulatedAdProvider, Tier, TransactionCoordinator};
//!
//! let mut economy = TransactionCoordinator::with_system_clock(
//!     Inventory::new_player("player-1"),
//!     Arc::new(SimulatedAdProvider::default()),
//!     None,
//! );
//! economy.initialize();
//!
//! economy.buy_container(Tier::Silver).await?;
//! let bundle = economy.open_container(Tier::Silver)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ads;
pub mod clock;
pub mod config;
pub mod consumable;
pub mod cooldown;
pub mod coordinator;
pub mod currency;
pub mod error;
pub mod events;
pub mod inventory;
pub mod persistence;
pub mod reward;
pub mod session;
pub mod transaction;

pub use ads::{AdProvider, SimulatedAdProvider};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LootboxConfig;
pub use consumable::{Consumable, HeadstartKind, PowerupKind};
pub use cooldown::{Tier, TierState};
pub use coordinator::TransactionCoordinator;
pub use currency::{Cost, Currency, CurrencyLedger};
pub use error::{EconomyError, EconomyResult};
pub use events::{EconomyEvent, EconomyObserver, EventBuffer, ObserverId};
pub use inventory::Inventory;
pub use persistence::{FileSaveSlot, MemorySaveSlot, SaveSlot, SavedStateSource, SlotPersister};
pub use reward::{RewardBundle, RewardGenerator};
pub use session::{bootstrap, BootstrapSource, SessionRegistry, SharedCoordinator};
pub use transaction::InventoryTransaction;

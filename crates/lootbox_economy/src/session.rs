//! # Sessions
//!
//! Session start-up and the per-player lock table.
//!
//! ## Bootstrap Order
//!
//! ```text
//! remote saved state (if a source and a player id are given)
//!   -> local save slot
//!     -> new player template
//! ```
//!
//! Every failure on the way down is logged and skipped. Bootstrap always
//! yields an inventory.

use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

use crate::coordinator::TransactionCoordinator;
use crate::inventory::Inventory;
use crate::persistence::{SaveSlot, SavedStateSource};

/// Length of generated player identifiers.
pub const PLAYER_ID_LEN: usize = 10;

/// Where a bootstrapped inventory came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapSource {
    /// The remote save service.
    Remote,
    /// The local save slot.
    LocalSlot,
    /// Nothing usable was found; a fresh template was created.
    NewPlayer,
}

/// Generates a random alphanumeric player id.
pub fn generate_player_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..PLAYER_ID_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Loads the inventory for a session.
///
/// `player_id` names the new player if every source comes up empty; a random
/// id is generated when it is `None`.
pub async fn bootstrap(
    player_id: Option<&str>,
    remote: Option<&dyn SavedStateSource>,
    slot: &dyn SaveSlot,
) -> (Inventory, BootstrapSource) {
    if let (Some(source), Some(id)) = (remote, player_id) {
        match source.fetch_saved_state(id).await {
            Ok(json) => match Inventory::from_json(&json) {
                Ok(inventory) => {
                    tracing::info!(user_id = inventory.user_id(), "loaded remote saved state");
                    return (inventory, BootstrapSource::Remote);
                }
                Err(e) => tracing::warn!(player_id = id, error = %e, "remote saved state unusable"),
            },
            Err(e) => tracing::warn!(player_id = id, error = %e, "remote saved state unavailable"),
        }
    }

    match slot.load() {
        Ok(Some(json)) => match Inventory::from_json(&json) {
            Ok(inventory) => {
                tracing::info!(user_id = inventory.user_id(), "loaded local save slot");
                return (inventory, BootstrapSource::LocalSlot);
            }
            Err(e) => tracing::warn!(error = %e, "local save slot unusable"),
        },
        Ok(None) => tracing::debug!("local save slot empty"),
        Err(e) => tracing::warn!(error = %e, "local save slot unreadable"),
    }

    let id = player_id.map_or_else(|| generate_player_id(&mut rand::thread_rng()), str::to_string);
    tracing::info!(user_id = %id, "starting new player");
    (Inventory::new_player(id), BootstrapSource::NewPlayer)
}

/// A coordinator shared between request handlers.
///
/// The async mutex is held across the ad-watch suspension, so one player's
/// operations never interleave.
pub type SharedCoordinator = Arc<tokio::sync::Mutex<TransactionCoordinator>>;

/// Active sessions keyed by player id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedCoordinator>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coordinator under its player's id, replacing any previous
    /// session for that player.
    pub fn insert(&self, coordinator: TransactionCoordinator) -> SharedCoordinator {
        let id = coordinator.inventory().user_id().to_string();
        let shared = Arc::new(tokio::sync::Mutex::new(coordinator));
        if self.sessions.write().insert(id.clone(), shared.clone()).is_some() {
            tracing::debug!(user_id = %id, "replaced existing session");
        }
        shared
    }

    /// Looks up a player's session.
    #[must_use]
    pub fn get(&self, player_id: &str) -> Option<SharedCoordinator> {
        self.sessions.read().get(player_id).cloned()
    }

    /// Ends a player's session. Observers go with it once the last handle drops.
    pub fn remove(&self, player_id: &str) -> Option<SharedCoordinator> {
        self.sessions.write().remove(player_id)
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

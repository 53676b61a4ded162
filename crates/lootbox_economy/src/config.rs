//! Session configuration, loaded from TOML.
//!
//! ```toml
//! [player]
//! id = "a1B2c3D4e5"
//!
//! [storage]
//! save_path = "./lootbox_save.json"
//!
//! [ads]
//! watch_delay_ms = 1000
//! succeed = true
//!
//! [rng]
//! seed = 42
//! ```
//!
//! Every table and key is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ads::SimulatedAdProvider;
use crate::error::{EconomyError, EconomyResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LootboxConfig {
    /// Player identity.
    pub player: PlayerConfig,
    /// Local save slot.
    pub storage: StorageConfig,
    /// Simulated ad provider.
    pub ads: AdsConfig,
    /// Reward randomness.
    pub rng: RngConfig,
}

/// `[player]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Fixed player id; generated when absent.
    pub id: Option<String>,
}

/// `[storage]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Save slot file.
    pub save_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("lootbox_save.json"),
        }
    }
}

/// `[ads]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdsConfig {
    /// Simulated ad length in milliseconds.
    pub watch_delay_ms: u64,
    /// Whether simulated ads complete.
    pub succeed: bool,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            watch_delay_ms: 1000,
            succeed: true,
        }
    }
}

impl AdsConfig {
    /// Builds the simulated provider described by this section.
    #[must_use]
    pub fn provider(&self) -> SimulatedAdProvider {
        SimulatedAdProvider::new(Duration::from_millis(self.watch_delay_ms), self.succeed)
    }
}

/// `[rng]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RngConfig {
    /// Fixed reward seed; OS entropy when absent.
    pub seed: Option<u64>,
}

impl LootboxConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML, unknown keys or invalid values.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| EconomyError::InvalidConfig(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            EconomyError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> EconomyResult<()> {
        if let Some(id) = &self.player.id {
            if id.trim().is_empty() {
                return Err(EconomyError::InvalidConfig("player.id is empty".into()));
            }
        }
        if self.storage.save_path.as_os_str().is_empty() {
            return Err(EconomyError::InvalidConfig("storage.save_path is empty".into()));
        }
        Ok(())
    }
}

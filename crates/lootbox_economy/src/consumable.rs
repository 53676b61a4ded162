//! # Consumables
//!
//! Single-use items held in count-based inventory slots.
//!
//! A consumable is either a headstart (applied at the start of a run) or a
//! powerup (picked up mid-run). Dispatch is a plain `match` on the variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EconomyError;

/// Headstart sub-kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadstartKind {
    /// Skip the first stretch of the run.
    LongDash,
    /// Double score multiplier for the run.
    DoubleMultiplier,
}

impl HeadstartKind {
    /// Every headstart kind.
    pub const ALL: [Self; 2] = [Self::LongDash, Self::DoubleMultiplier];
}

/// Powerup sub-kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    /// Bicycle ride.
    Bicycle,
    /// Roller skates.
    Skates,
    /// Motorcycle ride.
    Motorcycle,
}

impl PowerupKind {
    /// Every powerup kind.
    pub const ALL: [Self; 3] = [Self::Bicycle, Self::Skates, Self::Motorcycle];
}

/// A usable item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consumable {
    /// A headstart.
    Headstart(HeadstartKind),
    /// A powerup.
    Powerup(PowerupKind),
}

impl Consumable {
    /// Fires the gameplay trigger for this consumable.
    ///
    /// The trigger itself lives in the gameplay layer, which listens for
    /// `EconomyEvent::ConsumableUsed`; here we only trace it.
    pub fn activate(&self) {
        match self {
            Self::Headstart(kind) => tracing::info!(?kind, "headstart activated"),
            Self::Powerup(kind) => tracing::info!(?kind, "powerup activated"),
        }
    }
}

impl fmt::Display for HeadstartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongDash => f.write_str("LongDash"),
            Self::DoubleMultiplier => f.write_str("DoubleMultiplier"),
        }
    }
}

impl fmt::Display for PowerupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bicycle => f.write_str("Bicycle"),
            Self::Skates => f.write_str("Skates"),
            Self::Motorcycle => f.write_str("Motorcycle"),
        }
    }
}

impl fmt::Display for Consumable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Headstart(kind) => write!(f, "headstart {kind}"),
            Self::Powerup(kind) => write!(f, "powerup {kind}"),
        }
    }
}

impl FromStr for Consumable {
    type Err = EconomyError;

    /// Parses a bare kind name, e.g. `long-dash` or `skates`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "longdash" => Ok(Self::Headstart(HeadstartKind::LongDash)),
            "doublemultiplier" => Ok(Self::Headstart(HeadstartKind::DoubleMultiplier)),
            "bicycle" => Ok(Self::Powerup(PowerupKind::Bicycle)),
            "skates" => Ok(Self::Powerup(PowerupKind::Skates)),
            "motorcycle" => Ok(Self::Powerup(PowerupKind::Motorcycle)),
            _ => Err(EconomyError::InvalidTierOrKind(format!("unknown consumable '{s}'"))),
        }
    }
}

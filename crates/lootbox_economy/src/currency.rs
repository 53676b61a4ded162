//! # Currency Ledger
//!
//! Per-currency balances for one player.
//!
//! ## Guarantees
//!
//! 1. **No underflow**: `spend` fails with `InsufficientFunds` instead of wrapping
//! 2. **No overflow**: `add` fails with `CurrencyOverflow` instead of wrapping
//! 3. **No partial state**: a failed call leaves every balance unchanged
//!
//! Watching an advertisement is a purchase *action*, not a balance, so it is
//! modelled by [`Cost::AdWatch`] and never appears in the ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{EconomyError, EconomyResult};

/// A balance-bearing currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Soft currency earned from containers.
    Coins,
    /// Premium currency.
    Gems,
}

impl Currency {
    /// Every currency, in ledger order.
    pub const ALL: [Self; 2] = [Self::Coins, Self::Gems];
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coins => f.write_str("Coins"),
            Self::Gems => f.write_str("Gems"),
        }
    }
}

impl FromStr for Currency {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coins" | "coin" => Ok(Self::Coins),
            "gems" | "gem" => Ok(Self::Gems),
            _ => Err(EconomyError::InvalidTierOrKind(format!("unknown currency '{s}'"))),
        }
    }
}

/// What a purchase costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cost {
    /// Watch one advertisement to completion.
    AdWatch,
    /// Spend a fixed amount of a ledger currency.
    Currency {
        /// The currency charged.
        currency: Currency,
        /// Units charged.
        units: u32,
    },
}

impl Cost {
    /// Creates a currency cost.
    #[inline]
    #[must_use]
    pub const fn currency(currency: Currency, units: u32) -> Self {
        Self::Currency { currency, units }
    }
}

/// Balances for every [`Currency`].
///
/// Serializes as a plain `currency -> balance` map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyLedger {
    balances: BTreeMap<Currency, u32>,
}

impl CurrencyLedger {
    /// Creates a ledger with every currency at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_balances(&[])
    }

    /// Creates a ledger from starting balances; unspecified currencies are zero.
    #[must_use]
    pub fn with_balances(initial: &[(Currency, u32)]) -> Self {
        let mut balances: BTreeMap<Currency, u32> =
            Currency::ALL.iter().map(|&c| (c, 0)).collect();
        for &(currency, amount) in initial {
            balances.insert(currency, amount);
        }
        Self { balances }
    }

    /// Returns the balance of a currency.
    #[inline]
    #[must_use]
    pub fn balance(&self, currency: Currency) -> u32 {
        self.balances.get(&currency).copied().unwrap_or(0)
    }

    /// Iterates over `(currency, balance)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Currency, u32)> + '_ {
        self.balances.iter().map(|(&c, &b)| (c, b))
    }

    /// Returns true if `amount` can be added without overflowing.
    #[inline]
    #[must_use]
    pub fn can_add(&self, currency: Currency, amount: u32) -> bool {
        self.balance(currency).checked_add(amount).is_some()
    }

    /// Credits a balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::CurrencyOverflow` if the result would not fit in
    /// a `u32`. The balance is left unchanged.
    pub fn add(&mut self, currency: Currency, amount: u32) -> EconomyResult<()> {
        let balance = self.balance(currency);
        let updated = balance
            .checked_add(amount)
            .ok_or(EconomyError::CurrencyOverflow {
                currency,
                balance,
                amount,
            })?;
        self.balances.insert(currency, updated);
        Ok(())
    }

    /// Debits a balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds` if the balance is lower than
    /// `amount`. The balance is left unchanged.
    pub fn spend(&mut self, currency: Currency, amount: u32) -> EconomyResult<()> {
        let available = self.balance(currency);
        if available < amount {
            return Err(EconomyError::InsufficientFunds {
                currency,
                required: amount,
                available,
            });
        }
        self.balances.insert(currency, available - amount);
        Ok(())
    }

    /// Inserts zero balances for currencies missing from a loaded snapshot.
    pub(crate) fn fill_missing(&mut self) {
        for currency in Currency::ALL {
            self.balances.entry(currency).or_insert(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_add_and_spend() {
        let mut ledger = CurrencyLedger::new();
        ledger.add(Currency::Coins, 500).unwrap();
        ledger.spend(Currency::Coins, 200).unwrap();
        assert_eq!(ledger.balance(Currency::Coins), 300);
        assert_eq!(ledger.balance(Currency::Gems), 0);
    }

    #[test]
    fn test_spend_insufficient_leaves_balance() {
        let mut ledger = CurrencyLedger::with_balances(&[(Currency::Coins, 50)]);
        let result = ledger.spend(Currency::Coins, 100);
        assert_eq!(
            result,
            Err(EconomyError::InsufficientFunds {
                currency: Currency::Coins,
                required: 100,
                available: 50,
            })
        );
        assert_eq!(ledger.balance(Currency::Coins), 50);
    }

    #[test]
    fn test_add_overflow_rejected() {
        let mut ledger = CurrencyLedger::with_balances(&[(Currency::Gems, u32::MAX - 5)]);
        assert!(matches!(
            ledger.add(Currency::Gems, 6),
            Err(EconomyError::CurrencyOverflow { .. })
        ));
        assert_eq!(ledger.balance(Currency::Gems), u32::MAX - 5);

        ledger.add(Currency::Gems, 5).unwrap();
        assert_eq!(ledger.balance(Currency::Gems), u32::MAX);
    }

    #[test]
    fn test_random_sequences_stay_in_range() {
        for seed in 0..64u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut ledger = CurrencyLedger::new();
            let mut model: u64 = 0;

            for _ in 0..500 {
                let amount = if rng.gen_bool(0.1) {
                    rng.gen_range(u32::MAX / 2..=u32::MAX)
                } else {
                    rng.gen_range(0..10_000)
                };
                if rng.gen_bool(0.5) {
                    let ok = ledger.add(Currency::Coins, amount).is_ok();
                    assert_eq!(ok, model + u64::from(amount) <= u64::from(u32::MAX));
                    if ok {
                        model += u64::from(amount);
                    }
                } else {
                    let ok = ledger.spend(Currency::Coins, amount).is_ok();
                    assert_eq!(ok, model >= u64::from(amount));
                    if ok {
                        model -= u64::from(amount);
                    }
                }
                assert_eq!(u64::from(ledger.balance(Currency::Coins)), model);
            }
        }
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!("coins".parse::<Currency>().unwrap(), Currency::Coins);
        assert_eq!("GEMS".parse::<Currency>().unwrap(), Currency::Gems);
        assert!(matches!(
            "ads".parse::<Currency>(),
            Err(EconomyError::InvalidTierOrKind(_))
        ));
    }
}

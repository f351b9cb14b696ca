//! Currencies and amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::MAX_CURRENCY_LEN;
use crate::error::CurrencyError;

/// Identifier of a registered currency, e.g. `"SLT"`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct CurrencyId(String);

impl CurrencyId {
    /// Validate and wrap a currency id: 1 to 10 uppercase alphanumerics.
    pub fn new(s: impl Into<String>) -> Result<Self, CurrencyError> {
        let s = s.into();
        if s.is_empty() {
            return Err(CurrencyError::Empty);
        }
        if s.len() > MAX_CURRENCY_LEN {
            return Err(CurrencyError::TooLong(s.len()));
        }
        for c in s.chars() {
            if !c.is_ascii_uppercase() && !c.is_ascii_digit() {
                return Err(CurrencyError::InvalidCharacter(c));
            }
        }
        Ok(Self(s))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyId {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An amount of one currency.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Amount {
    /// Currency the value is denominated in.
    pub currency: CurrencyId,
    /// Value in the currency's smallest unit.
    pub value: u128,
}

impl Amount {
    /// Construct an amount.
    pub fn new(currency: CurrencyId, value: u128) -> Self {
        Self { currency, value }
    }
}

/// Metadata of a registered currency, held by the primary ledger store.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct CurrencyDesign {
    /// Currency id.
    pub currency: CurrencyId,
    /// Total supply created at genesis.
    pub genesis_supply: u128,
    /// Minimum balance an account may hold in this currency.
    pub min_balance: u128,
}

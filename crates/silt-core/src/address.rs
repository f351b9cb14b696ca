//! Ledger addresses.
//!
//! An address is an opaque validated identifier assigned by the consensus
//! engine. The index never derives addresses from keys; it only needs a
//! stable, comparable form for record keys and HTTP paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_ADDRESS_LEN, MIN_ADDRESS_LEN};
use crate::error::AddressError;

/// A validated ledger address.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Validate and wrap an address string.
    ///
    /// Addresses are 3 to 64 characters, start with an alphanumeric
    /// character, and contain only alphanumerics, `-`, `_`, and `.`.
    pub fn new(s: impl Into<String>) -> Result<Self, AddressError> {
        let s = s.into();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.len() < MIN_ADDRESS_LEN {
            return Err(AddressError::TooShort(s.len()));
        }
        if s.len() > MAX_ADDRESS_LEN {
            return Err(AddressError::TooLong(s.len()));
        }
        let first = s.chars().next().unwrap_or('\0');
        if !first.is_ascii_alphanumeric() {
            return Err(AddressError::InvalidLeadingCharacter(first));
        }
        for c in s.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(AddressError::InvalidCharacter(c));
            }
        }
        Ok(Self(s))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fixed-width key prefix for address-keyed store records.
    ///
    /// BLAKE3 of the address string; fixed width keeps RocksDB prefix
    /// iteration exact for variable-length addresses.
    pub fn key_prefix(&self) -> [u8; 32] {
        *blake3::hash(self.0.as_bytes()).as_bytes()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_addresses() {
        for s in ["abc", "alice-01", "Node_7.main", "a1b"] {
            assert!(Address::new(s).is_ok(), "should accept {s:?}");
        }
        assert!(Address::new("x".repeat(64)).is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Address::new(""), Err(AddressError::Empty));
    }

    #[test]
    fn rejects_short_and_long() {
        assert_eq!(Address::new("ab"), Err(AddressError::TooShort(2)));
        assert_eq!(
            Address::new("y".repeat(65)),
            Err(AddressError::TooLong(65))
        );
    }

    #[test]
    fn rejects_bad_leading_char() {
        assert_eq!(
            Address::new("-abc"),
            Err(AddressError::InvalidLeadingCharacter('-'))
        );
    }

    #[test]
    fn rejects_bad_char() {
        assert_eq!(
            Address::new("ali ce"),
            Err(AddressError::InvalidCharacter(' '))
        );
        assert_eq!(
            Address::new("ali:ce"),
            Err(AddressError::InvalidCharacter(':'))
        );
    }

    #[test]
    fn key_prefix_is_stable_and_distinct() {
        let a = Address::new("alice-01").unwrap();
        let b = Address::new("alice-02").unwrap();
        assert_eq!(a.key_prefix(), a.key_prefix());
        assert_ne!(a.key_prefix(), b.key_prefix());
    }

    #[test]
    fn from_str_round_trip() {
        let a: Address = "carol.7".parse().unwrap();
        assert_eq!(a.as_str(), "carol.7");
        assert_eq!(a.to_string(), "carol.7");
    }
}

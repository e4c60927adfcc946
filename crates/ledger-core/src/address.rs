//! Account addresses.
//!
//! Accounts are identified by 20-byte addresses written as `0x` followed by
//! 40 hex digits. Parsing accepts either case and an optional `0x` prefix;
//! display is always lowercase and prefixed, which makes the display form
//! a stable, fixed-width storage key component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Wrap raw address bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw address bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parse `0x`-prefixed (or bare) hex.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from [`Address::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// Wrong number of hex digits (after stripping `0x`).
    InvalidLength(usize),
    /// Non-hex characters.
    InvalidHex,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(n) => {
                write!(f, "address must be {} hex digits, got {n}", ADDRESS_LEN * 2)
            }
            Self::InvalidHex => write!(f, "address contains non-hex characters"),
        }
    }
}

impl std::error::Error for AddressError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BOB: &str = "0x00000000000000000000000000000000000000b0";

    #[test]
    fn parse_and_display() {
        let addr = Address::parse(BOB).unwrap();
        assert_eq!(addr.as_bytes()[19], 0xb0);
        assert_eq!(addr.to_string(), BOB);
    }

    #[test]
    fn parse_is_case_insensitive_and_prefix_optional() {
        let upper = "0X00000000000000000000000000000000000000B0";
        let bare = &BOB[2..];
        assert_eq!(Address::parse(upper).unwrap(), Address::parse(bare).unwrap());
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(Address::parse("0x1234"), Err(AddressError::InvalidLength(4)));
    }

    #[test]
    fn non_hex_rejected() {
        let bad = "0xzz000000000000000000000000000000000000b0";
        assert_eq!(Address::parse(bad), Err(AddressError::InvalidHex));
    }

    #[test]
    fn serde_uses_display_form() {
        let addr = Address::from_bytes([0xab; ADDRESS_LEN]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(ADDRESS_LEN)));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
    }
}

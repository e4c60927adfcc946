//! Core types for the range ledger.
//!
//! - [`Address`] -- 20-byte account identifier, `0x`-prefixed hex
//! - [`TokenId`] -- token identifier (unsigned 128-bit)
//! - [`Interval`] -- validated half-open range `[start, end)` of one token
//!
//! Numeric values are `u128` throughout and cross serialization boundaries
//! as decimal strings, so JSON consumers never narrow them to a float.

pub mod address;
pub mod interval;

mod decimal;

pub use address::{Address, AddressError};
pub use interval::{Interval, InvalidRange};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Token identifier.
///
/// Ordered numerically; the ledger groups per-owner output by ascending
/// token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenId(pub u128);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = InvalidRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decimal::parse_u128(s).map(Self)
    }
}

impl From<u128> for TokenId {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decimal::deserialize_u128(deserializer).map(Self)
    }
}

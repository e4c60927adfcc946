//! Decimal `u128` parsing shared by the serde impls.

use serde::{Deserialize, Deserializer};

use crate::InvalidRange;

/// Wire form of an unsigned bound: a decimal string or a JSON integer.
///
/// JSON integers are limited to the `u64`/`i64` range; anything wider has
/// to travel as a string.
///
/// Negative integers are accepted here only so they can be rejected with
/// a precise [`InvalidRange::Negative`] instead of a generic type error.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl NumberRepr {
    pub(crate) fn into_u128(self) -> Result<u128, InvalidRange> {
        match self {
            Self::Text(s) => parse_u128(&s),
            Self::Unsigned(n) => Ok(u128::from(n)),
            Self::Signed(n) if n < 0 => Err(InvalidRange::Negative(n.to_string())),
            Self::Signed(n) => Ok(n.unsigned_abs().into()),
        }
    }
}

/// Parse an unsigned decimal, rejecting signs other than a leading `+`.
pub(crate) fn parse_u128(s: &str) -> Result<u128, InvalidRange> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(InvalidRange::Negative(trimmed.to_owned()));
    }
    trimmed
        .parse::<u128>()
        .map_err(|_| InvalidRange::Malformed(trimmed.to_owned()))
}

pub(crate) fn deserialize_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    NumberRepr::deserialize(deserializer)?
        .into_u128()
        .map_err(serde::de::Error::custom)
}

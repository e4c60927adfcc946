//! Token-denominated half-open intervals.
//!
//! An [`Interval`] is the unit of ownership in the ledger: the owner of
//! `[start, end)` of token `t` owns `end - start` units of `t`, and the
//! specific coin ids inside it. Construction validates `start < end`, so
//! every `Interval` value in the program is well formed.
//!
//! # Wire format
//!
//! ```json
//! { "token": "0", "start": "100", "end": "150" }
//! ```
//!
//! Bounds may also be JSON integers up to `u64::MAX`; larger bounds must be
//! decimal strings, since a JSON integer past that limit is refused.
//! Negative or unparsable bounds are rejected with [`InvalidRange`] during
//! deserialization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TokenId;
use crate::decimal::NumberRepr;

// ---------------------------------------------------------------------------
// InvalidRange
// ---------------------------------------------------------------------------

/// A range that cannot be represented as an [`Interval`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRange {
    /// `start >= end`: the range is empty or reversed.
    Empty {
        /// Requested start.
        start: u128,
        /// Requested end.
        end: u128,
    },
    /// A bound was negative. Carries the offending text.
    Negative(String),
    /// A bound was not an unsigned decimal integer.
    Malformed(String),
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { start, end } => {
                write!(f, "invalid range [{start}, {end}): start must be below end")
            }
            Self::Negative(v) => write!(f, "invalid range bound {v}: must not be negative"),
            Self::Malformed(v) => write!(f, "invalid range bound {v:?}: not an unsigned integer"),
        }
    }
}

impl std::error::Error for InvalidRange {}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Half-open range `[start, end)` of one token. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "IntervalRepr", try_from = "IntervalRepr")]
pub struct Interval {
    token: TokenId,
    start: u128,
    end: u128,
}

impl Interval {
    /// Build an interval, rejecting `start >= end`.
    pub fn new(token: TokenId, start: u128, end: u128) -> Result<Self, InvalidRange> {
        if start >= end {
            return Err(InvalidRange::Empty { start, end });
        }
        Ok(Self { token, start, end })
    }

    /// Build an interval from textual bounds (decimal).
    ///
    /// Used at input boundaries where a bound may arrive signed.
    pub fn parse(token: TokenId, start: &str, end: &str) -> Result<Self, InvalidRange> {
        let start = crate::decimal::parse_u128(start)?;
        let end = crate::decimal::parse_u128(end)?;
        Self::new(token, start, end)
    }

    /// Build an interval from signed bounds, rejecting negative values.
    pub fn from_signed(token: TokenId, start: i128, end: i128) -> Result<Self, InvalidRange> {
        let start = u128::try_from(start).map_err(|_| InvalidRange::Negative(start.to_string()))?;
        let end = u128::try_from(end).map_err(|_| InvalidRange::Negative(end.to_string()))?;
        Self::new(token, start, end)
    }

    pub const fn token(&self) -> TokenId {
        self.token
    }

    pub const fn start(&self) -> u128 {
        self.start
    }

    pub const fn end(&self) -> u128 {
        self.end
    }

    /// Number of units covered: `end - start`. Never zero.
    pub const fn width(&self) -> u128 {
        self.end - self.start
    }

    /// `other` lies entirely inside `self` (same token).
    pub fn contains(&self, other: &Interval) -> bool {
        self.token == other.token && self.start <= other.start && other.end <= self.end
    }

    /// The two share at least one unit (touching does not count).
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.token == other.token && self.start < other.end && other.start < self.end
    }

    /// The two overlap or share a boundary, so their union is one interval.
    pub fn touches(&self, other: &Interval) -> bool {
        self.token == other.token && self.start <= other.end && other.start <= self.end
    }

    /// Same token, new bounds.
    pub(crate) fn with_bounds(&self, start: u128, end: u128) -> Result<Self, InvalidRange> {
        Self::new(self.token, start, end)
    }

    /// Smallest interval covering both. Caller guarantees they touch.
    pub fn span(&self, other: &Interval) -> Interval {
        Self {
            token: self.token,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// What is left of `self` after taking out `inner`, which must be
    /// contained in it: zero, one or two pieces, in ascending order.
    pub fn subtract(&self, inner: &Interval) -> Vec<Interval> {
        debug_assert!(self.contains(inner));
        [(self.start, inner.start), (inner.end, self.end)]
            .into_iter()
            .filter_map(|(start, end)| self.with_bounds(start, end).ok())
            .collect()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:[{}, {})", self.token, self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Serde representation
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct IntervalRepr {
    token: TokenId,
    #[serde(serialize_with = "serialize_decimal")]
    start: NumberRepr,
    #[serde(serialize_with = "serialize_decimal")]
    end: NumberRepr,
}

fn serialize_decimal<S: serde::Serializer>(value: &NumberRepr, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        NumberRepr::Text(s) => serializer.serialize_str(s),
        NumberRepr::Unsigned(n) => serializer.collect_str(n),
        NumberRepr::Signed(n) => serializer.collect_str(n),
    }
}

impl From<Interval> for IntervalRepr {
    fn from(interval: Interval) -> Self {
        Self {
            token: interval.token,
            start: NumberRepr::Text(interval.start.to_string()),
            end: NumberRepr::Text(interval.end.to_string()),
        }
    }
}

impl TryFrom<IntervalRepr> for Interval {
    type Error = InvalidRange;

    fn try_from(repr: IntervalRepr) -> Result<Self, Self::Error> {
        Interval::new(repr.token, repr.start.into_u128()?, repr.end.into_u128()?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: TokenId = TokenId(0);

    #[test]
    fn numeric_bounds_stop_at_u64() {
        let at_limit = format!(r#"{{"token":"0","start":0,"end":{}}}"#, u64::MAX);
        assert_eq!(
            serde_json::from_str::<Interval>(&at_limit).unwrap().end(),
            u128::from(u64::MAX)
        );

        let past_limit = r#"{"token":"0","start":0,"end":18446744073709551616}"#;
        assert!(serde_json::from_str::<Interval>(past_limit).is_err());

        let as_text = r#"{"token":"0","start":"0","end":"18446744073709551616"}"#;
        assert_eq!(
            serde_json::from_str::<Interval>(as_text).unwrap().end(),
            u128::from(u64::MAX) + 1
        );
    }

    fn iv(start: u128, end: u128) -> Interval {
        Interval::new(TOKEN, start, end).unwrap()
    }

    #[test]
    fn rejects_empty_and_reversed() {
        assert_eq!(
            Interval::new(TOKEN, 5, 5),
            Err(InvalidRange::Empty { start: 5, end: 5 })
        );
        assert!(Interval::new(TOKEN, 6, 5).is_err());
    }

    #[test]
    fn rejects_negative_start() {
        assert_eq!(
            Interval::from_signed(TOKEN, -50, 100),
            Err(InvalidRange::Negative("-50".into()))
        );
        assert!(matches!(
            Interval::parse(TOKEN, "-50", "100"),
            Err(InvalidRange::Negative(_))
        ));
    }

    #[test]
    fn width_is_end_minus_start() {
        assert_eq!(iv(10, 25).width(), 15);
        assert_eq!(iv(0, u128::MAX).width(), u128::MAX);
    }

    #[test]
    fn overlap_versus_touch() {
        let a = iv(0, 10);
        assert!(a.touches(&iv(10, 20)));
        assert!(!a.overlaps(&iv(10, 20)));
        assert!(a.overlaps(&iv(9, 20)));
        assert!(!a.touches(&iv(11, 20)));
    }

    #[test]
    fn different_tokens_never_relate() {
        let a = iv(0, 10);
        let b = Interval::new(TokenId(1), 0, 10).unwrap();
        assert!(!a.touches(&b));
        assert!(!a.contains(&b));
    }

    #[test]
    fn subtract_cases() {
        let whole = iv(0, 100);
        assert!(whole.subtract(&iv(0, 100)).is_empty());
        assert_eq!(whole.subtract(&iv(0, 40)), vec![iv(40, 100)]);
        assert_eq!(whole.subtract(&iv(60, 100)), vec![iv(0, 60)]);
        assert_eq!(whole.subtract(&iv(40, 60)), vec![iv(0, 40), iv(60, 100)]);
    }

    #[test]
    fn json_uses_decimal_strings() {
        let json = serde_json::to_value(iv(1, u128::MAX)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "token": "0", "start": "1", "end": u128::MAX.to_string() })
        );
        let back: Interval = serde_json::from_value(json).unwrap();
        assert_eq!(back, iv(1, u128::MAX));
    }

    #[test]
    fn json_rejects_negative_start() {
        let err = serde_json::from_str::<Interval>(r#"{"token":"0","start":-50,"end":100}"#)
            .unwrap_err();
        assert!(err.to_string().contains("must not be negative"), "{err}");
    }

    #[test]
    fn json_rejects_empty() {
        assert!(serde_json::from_str::<Interval>(r#"{"token":0,"start":"9","end":"9"}"#).is_err());
    }
}

//! Range ledger configuration.
//!
//! - [`LedgerConfig`] -- overlap policy and storage sizing
//! - [`OverlapPolicy`] -- what `add_range` does with a conflicting claim
//! - [`constants`] -- storage key prefixes and defaults
//!
//! Presets are `const` and the types are `Copy`. This crate has no
//! dependencies so every other crate can use it as a leaf.

pub mod constants;

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// OverlapPolicy
// ---------------------------------------------------------------------------

/// How the ledger treats an added range that partially overlaps one the
/// owner already holds.
///
/// Touching ranges (`a.end == b.start`) always merge; this only governs
/// true intersections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// The new claim is authoritative: overlapped ranges are folded into
    /// one interval spanning both. Assumes proofs were checked upstream.
    #[default]
    Absorb,
    /// Reject the addition and leave the stored set untouched.
    Reject,
}

impl OverlapPolicy {
    /// The lowercase name accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absorb => "absorb",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an overlap policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOverlapPolicy(pub String);

impl fmt::Display for UnknownOverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown overlap policy {:?} (expected \"absorb\" or \"reject\")",
            self.0
        )
    }
}

impl std::error::Error for UnknownOverlapPolicy {}

impl FromStr for OverlapPolicy {
    type Err = UnknownOverlapPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absorb" => Ok(Self::Absorb),
            "reject" | "strict" => Ok(Self::Reject),
            _ => Err(UnknownOverlapPolicy(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Ledger-wide configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Conflict handling for overlapping additions.
    pub overlap_policy: OverlapPolicy,

    /// Maximum LMDB map size in bytes (only used by the LMDB backend).
    pub lmdb_map_size: usize,
}

impl LedgerConfig {
    /// Absorb overlapping claims. Matches an operator that has already
    /// validated every transaction proof before it reaches the ledger.
    pub const DEFAULT: Self = Self {
        overlap_policy: OverlapPolicy::Absorb,
        lmdb_map_size: constants::DEFAULT_LMDB_MAP_SIZE,
    };

    /// Reject overlapping claims.
    pub const STRICT: Self = Self {
        overlap_policy: OverlapPolicy::Reject,
        lmdb_map_size: constants::DEFAULT_LMDB_MAP_SIZE,
    };

    /// Returns a copy with a different overlap policy.
    pub const fn with_overlap_policy(self, overlap_policy: OverlapPolicy) -> Self {
        Self {
            overlap_policy,
            ..self
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

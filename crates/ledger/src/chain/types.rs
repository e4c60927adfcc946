//! Chain records: deposits, transfers, transactions, block headers.

use std::fmt;
use std::str::FromStr;

use ledger_core::{Address, Interval};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Hash256
// ---------------------------------------------------------------------------

/// 32-byte digest, hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

/// Transaction identifier.
pub type TxHash = Hash256;

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({self})")
    }
}

impl FromStr for Hash256 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

/// Funds entering the layer-2 chain from the root chain.
///
/// The deposited range is fresh: no account held it before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Account credited.
    pub owner: Address,
    /// Range created by the deposit.
    pub range: Interval,
    /// Root-chain block the deposit was observed in.
    pub block: u64,
}

// ---------------------------------------------------------------------------
// Transfer / Transaction
// ---------------------------------------------------------------------------

/// Moves one range from `sender` to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: Address,
    pub recipient: Address,
    pub range: Interval,
}

/// A batch of transfers applied atomically, included in `block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub block: u64,
    pub transfers: Vec<Transfer>,
}

impl Transaction {
    /// SHA-256 over a fixed-width binary encoding:
    /// `block (8 BE) || per transfer: sender (20) || recipient (20) ||
    /// token (16 BE) || start (16 BE) || end (16 BE)`.
    pub fn hash(&self) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(self.block.to_be_bytes());
        for t in &self.transfers {
            hasher.update(t.sender.as_bytes());
            hasher.update(t.recipient.as_bytes());
            hasher.update(t.range.token().0.to_be_bytes());
            hasher.update(t.range.start().to_be_bytes());
            hasher.update(t.range.end().to_be_bytes());
        }
        Hash256(hasher.finalize().into())
    }
}

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

/// Commitment to one layer-2 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    /// Root of the block's transaction tree.
    pub root: Hash256,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::TokenId;

    fn transfer(start: u128, end: u128) -> Transfer {
        Transfer {
            sender: Address::from_bytes([1; 20]),
            recipient: Address::from_bytes([2; 20]),
            range: Interval::new(TokenId(0), start, end).unwrap(),
        }
    }

    #[test]
    fn hash_is_deterministic_and_sensitive() {
        let a = Transaction {
            block: 1,
            transfers: vec![transfer(0, 10)],
        };
        let mut b = a.clone();
        assert_eq!(a.hash(), b.hash());

        b.transfers[0] = transfer(0, 11);
        assert_ne!(a.hash(), b.hash());

        let mut c = a.clone();
        c.block = 2;
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn hash_text_round_trip() {
        let h = Transaction {
            block: 9,
            transfers: vec![],
        }
        .hash();
        let text = h.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Hash256>().unwrap(), h);
        assert_eq!(format!("0x{text}").parse::<Hash256>().unwrap(), h);
    }

    #[test]
    fn transaction_json_shape() {
        let tx = Transaction {
            block: 3,
            transfers: vec![transfer(5, 6)],
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["block"], 3);
        assert_eq!(json["transfers"][0]["range"]["start"], "5");
        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}

//! Proof checking seam.
//!
//! The ledger does not validate transaction proofs itself. A
//! [`ProofChecker`] supplied at construction decides whether a transaction
//! may be applied; [`TrustedProofs`] accepts everything, for deployments
//! where proofs are verified before transactions reach the ledger.

use super::types::Transaction;
use crate::LedgerError;

/// Decides whether a transaction may be applied.
pub trait ProofChecker: Send + Sync {
    /// Return `Ok(())` to apply `tx`, or
    /// [`LedgerError::ProofRejected`] to refuse it.
    fn check(&self, tx: &Transaction, proof: &[u8]) -> Result<(), LedgerError>;
}

/// Accepts every transaction. Stateless, zero-sized.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedProofs;

impl ProofChecker for TrustedProofs {
    fn check(&self, _tx: &Transaction, _proof: &[u8]) -> Result<(), LedgerError> {
        Ok(())
    }
}

impl<P: ProofChecker + ?Sized> ProofChecker for std::sync::Arc<P> {
    fn check(&self, tx: &Transaction, proof: &[u8]) -> Result<(), LedgerError> {
        (**self).check(tx, proof)
    }
}

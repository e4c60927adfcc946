//! JSON-line request/reply protocol.
//!
//! Each request is one JSON object tagged by `"method"`. Amounts and range
//! bounds travel as decimal strings.
//!
//! ```text
//! {"method":"deposit","owner":"0x..","range":{"token":"0","start":"0","end":"100"},"block":1}
//! {"method":"transaction","transaction":{"block":2,"transfers":[..]},"proof":"00ff"}
//! {"method":"owned_ranges","owner":"0x.."}
//! {"method":"balances","owner":"0x.."}
//! {"method":"pick_ranges","owner":"0x..","token":"0","amount":"40"}
//! {"method":"block_header","number":3,"root":"<64 hex>"}
//! {"method":"get_transaction","hash":"<64 hex>"}
//! ```
//!
//! Replies are `{"ok": <value>}` or `{"error": "<message>"}`.

use std::collections::BTreeMap;

use ledger::LedgerError;
use ledger::chain::{Applied, BlockHeader, ChainService, Deposit, ProofChecker, Transaction, TxHash};
use ledger_core::{Address, TokenId};
use serde::Deserialize;
use serde_json::{Value, json};
use storage::KeyValueStore;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    Deposit(Deposit),
    Transaction {
        transaction: Transaction,
        /// Hex-encoded proof bytes.
        #[serde(default)]
        proof: String,
    },
    OwnedRanges {
        owner: Address,
    },
    Balances {
        owner: Address,
    },
    PickRanges {
        owner: Address,
        token: TokenId,
        amount: String,
    },
    BlockHeader(BlockHeader),
    GetTransaction {
        hash: TxHash,
    },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Deposit(_) => "deposit",
            Self::Transaction { .. } => "transaction",
            Self::OwnedRanges { .. } => "owned_ranges",
            Self::Balances { .. } => "balances",
            Self::PickRanges { .. } => "pick_ranges",
            Self::BlockHeader(_) => "block_header",
            Self::GetTransaction { .. } => "get_transaction",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a request produced an error reply.
#[derive(Debug)]
pub enum RequestError {
    /// The line is not a valid request.
    Malformed(String),
    /// The ledger refused the operation.
    Ledger(LedgerError),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed request: {msg}"),
            Self::Ledger(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ledger(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }
}

impl From<LedgerError> for RequestError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn parse(line: &str) -> Result<Request, RequestError> {
    serde_json::from_str(line).map_err(|e| RequestError::Malformed(e.to_string()))
}

/// Execute `request` against `chain`, producing the `ok` payload.
pub fn handle<S, P>(chain: &ChainService<S, P>, request: Request) -> Result<Value, RequestError>
where
    S: KeyValueStore,
    P: ProofChecker,
{
    match request {
        Request::Deposit(deposit) => {
            let applied = chain.add_deposit(&deposit)?;
            Ok(json!({ "applied": applied == Applied::Applied }))
        }
        Request::Transaction { transaction, proof } => {
            let proof = hex::decode(&proof)
                .map_err(|e| RequestError::Malformed(format!("proof: {e}")))?;
            let applied = chain.add_transaction(&transaction, &proof)?;
            Ok(json!({
                "hash": transaction.hash().to_string(),
                "applied": applied == Applied::Applied,
            }))
        }
        Request::OwnedRanges { owner } => Ok(json!(chain.get_owned_ranges(&owner)?)),
        Request::Balances { owner } => {
            let balances: BTreeMap<String, String> = chain
                .get_balances(&owner)?
                .into_iter()
                .map(|(token, amount)| (token.to_string(), amount.to_string()))
                .collect();
            Ok(json!(balances))
        }
        Request::PickRanges {
            owner,
            token,
            amount,
        } => {
            let amount: u128 = amount
                .parse()
                .map_err(|_| RequestError::Malformed(format!("amount {amount:?}")))?;
            let picked = chain.pick_ranges(&owner, token, amount)?;
            Ok(json!({
                "selected": picked.selected,
                "total": picked.total.to_string(),
                "change": picked.change(amount).to_string(),
            }))
        }
        Request::BlockHeader(header) => {
            chain.add_block_header(&header)?;
            Ok(json!({ "latest_block": chain.latest_block()? }))
        }
        Request::GetTransaction { hash } => Ok(json!(chain.get_transaction(&hash)?)),
    }
}

/// Parse, execute and render one request line.
pub fn dispatch<S, P>(chain: &ChainService<S, P>, line: &str) -> String
where
    S: KeyValueStore,
    P: ProofChecker,
{
    let outcome = parse(line).and_then(|request| {
        let method = request.method();
        let outcome = handle(chain, request);
        match &outcome {
            Ok(_) => debug!(method, "request handled"),
            Err(e) => warn!(method, error = %e, "request failed"),
        }
        outcome
    });
    reply(outcome)
}

/// Render a handler outcome as one reply line (no trailing newline).
pub fn reply(outcome: Result<Value, RequestError>) -> String {
    match outcome {
        Ok(value) => json!({ "ok": value }).to_string(),
        Err(e) => json!({ "error": e.to_string() }).to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

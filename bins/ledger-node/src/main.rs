//! Range ledger node.
//!
//! Wires the ledger collaborators explicitly (store, proof checker,
//! configuration), then serves JSON-line requests from stdin, one reply
//! line per request on stdout. Logs go to stderr.
//!
//! # Configuration
//!
//! - `LEDGER_OVERLAP_POLICY`: `absorb` (default) or `reject`.
//! - `LEDGER_DB_PATH`: LMDB directory (requires the `lmdb` feature). When
//!   unset, state lives in memory and is lost on exit.
//! - `RUST_LOG`: tracing filter.
//!
//! ```bash
//! echo '{"method":"balances","owner":"0xb0b0000000000000000000000000000000000000"}' \
//!     | RUST_LOG=info cargo run --release -p ledger-node
//! ```

mod protocol;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::{LedgerConfig, OverlapPolicy};
use ledger::chain::{ChainService, TrustedProofs};
use storage::{InMemoryKvStore, KeyValueStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("ledger-node starting");

    let config = resolve_config("LEDGER_OVERLAP_POLICY");
    tracing::info!(overlap_policy = %config.overlap_policy, "configuration loaded");

    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received ctrl-c, shutting down");
                signal_cancel.cancel();
            }
            Err(e) => tracing::warn!(%e, "cannot listen for ctrl-c"),
        }
    });

    match std::env::var_os("LEDGER_DB_PATH") {
        #[cfg(feature = "lmdb")]
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let kv = storage::HeedKvStore::open(&path, config.lmdb_map_size)
                .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()));
            tracing::info!(path = %path.display(), "using lmdb store");
            let chain = ChainService::new(Arc::new(kv), TrustedProofs, config);
            serve(chain, stdin(), tokio::io::stdout(), cancel).await;
        }
        #[cfg(not(feature = "lmdb"))]
        Some(_) => panic!("LEDGER_DB_PATH is set but ledger-node was built without the lmdb feature"),
        None => {
            tracing::info!("using in-memory store");
            let kv = InMemoryKvStore::new();
            let chain = ChainService::new(Arc::new(kv), TrustedProofs, config);
            serve(chain, stdin(), tokio::io::stdout(), cancel).await;
        }
    }

    tracing::info!("ledger-node stopped");
}

// ---------------------------------------------------------------------------
// Request loop
// ---------------------------------------------------------------------------

/// Answer requests from `input` until EOF or `cancel` fires.
async fn serve<S, R, W>(chain: ChainService<S>, input: R, mut output: W, cancel: CancellationToken)
where
    S: KeyValueStore + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("input closed");
                break;
            }
            Err(e) => {
                tracing::error!(%e, "failed to read request");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = answer(&chain, line).await;
        if let Err(e) = write_line(&mut output, &reply).await {
            tracing::error!(%e, "failed to write reply");
            break;
        }
    }
}

/// Run one request on the blocking pool; store calls may touch disk.
async fn answer<S>(chain: &ChainService<S>, line: String) -> String
where
    S: KeyValueStore + 'static,
{
    let chain = chain.clone();
    match tokio::task::spawn_blocking(move || protocol::dispatch(&chain, &line)).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(%e, "request handler panicked");
            serde_json::json!({ "error": "internal error" }).to_string()
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, reply: &str) -> std::io::Result<()> {
    output.write_all(reply.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stdin() -> BufReader<tokio::io::Stdin> {
    BufReader::new(tokio::io::stdin())
}

/// Default configuration with the overlap policy taken from `env_key`.
fn resolve_config(env_key: &str) -> LedgerConfig {
    match std::env::var(env_key) {
        Ok(value) => {
            let policy: OverlapPolicy = value
                .parse()
                .unwrap_or_else(|e| panic!("{env_key} is not a valid overlap policy: {e}"));
            LedgerConfig::DEFAULT.with_overlap_policy(policy)
        }
        Err(_) => LedgerConfig::DEFAULT,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ChainService<InMemoryKvStore> {
        ChainService::new(
            Arc::new(InMemoryKvStore::new()),
            TrustedProofs,
            LedgerConfig::DEFAULT,
        )
    }

    #[tokio::test]
    async fn serve_answers_each_line() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, mut client_write) = tokio::io::split(client);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(serve(
            chain(),
            BufReader::new(server_read),
            server_write,
            cancel.clone(),
        ));

        client_write
            .write_all(
                b"{\"method\":\"balances\",\"owner\":\"0xb0b0000000000000000000000000000000000000\"}\n\n{\"method\":\"launch\"}\n",
            )
            .await
            .unwrap();

        let mut replies = BufReader::new(client_read).lines();
        assert_eq!(replies.next_line().await.unwrap().unwrap(), r#"{"ok":{}}"#);
        let second = replies.next_line().await.unwrap().unwrap();
        assert!(second.starts_with(r#"{"error":"#), "{second}");

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn serve_stops_when_cancelled() {
        // The client end stays open, so input never reaches EOF.
        let (_client, server) = tokio::io::duplex(64);
        let (server_read, server_write) = tokio::io::split(server);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(serve(
            chain(),
            BufReader::new(server_read),
            server_write,
            cancel.clone(),
        ));

        cancel.cancel();
        task.await.unwrap();
    }
}

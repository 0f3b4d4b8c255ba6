//! Ledger access over Ethereum-style JSON-RPC
//!
//! Only two read-only methods are used: `eth_blockNumber` and
//! `eth_getBlockByNumber` with full transaction bodies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use akv_core::{
    Block, Error, Ledger, LedgerTransaction, Result, RetryConfig, TxHash, is_retryable_error,
    retry_with_backoff,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC ledger client
#[derive(Debug)]
pub struct RpcLedger {
    http: reqwest::Client,
    url: String,
    retry: RetryConfig,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(url: impl Into<String>, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            retry,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        retry_with_backoff(
            &self.retry,
            || self.call_once(method, params.clone()),
            is_retryable_error,
        )
        .await
    }

    async fn call_once<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method = method, id = id, "JSON-RPC request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("HTTP {status} from {}", self.url)));
        }

        let envelope: RpcResponse<T> = response.json().await.map_err(transport_error)?;
        if let Some(err) = envelope.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| Error::Network(format!("{method} returned no result")))
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn block_number(&self) -> Result<u64> {
        let quantity: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&quantity)
    }

    async fn block_with_transactions(&self, number: u64) -> Result<Block> {
        // A `null` result (unknown block) surfaces as "returned no result"
        let block: RpcBlock = self
            .call("eth_getBlockByNumber", json!([format!("{number:#x}"), true]))
            .await?;
        block.into_block()
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("request timeout: {e}"))
    } else if e.is_connect() {
        Error::Network(format!("connection refused: {e}"))
    } else if e.is_decode() {
        Error::Network(format!("malformed response: {e}"))
    } else {
        Error::Network(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: String,
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    hash: String,
    from: Option<String>,
}

impl RpcBlock {
    fn into_block(self) -> Result<Block> {
        let number = parse_quantity(&self.number)?;
        let transactions = self
            .transactions
            .into_iter()
            .map(|tx| {
                let hash = tx.hash.parse::<TxHash>().map_err(Error::Network)?;
                Ok(LedgerTransaction {
                    hash,
                    from: tx.from,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Block {
            number,
            transactions,
        })
    }
}

/// Decode a hex `QUANTITY` such as `0x1b4`
fn parse_quantity(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| Error::Network(format!("quantity '{s}' lacks 0x prefix")))?;
    u64::from_str_radix(digits, 16).map_err(|e| Error::Network(format!("bad quantity '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const HASH_A: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
    const HASH_B: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

    /// Serve one canned JSON body per connection, in order, and hand back the
    /// request bodies that were received
    async fn serve(bodies: Vec<String>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request_body(&mut socket).await);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });
        (url, handle)
    }

    async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if data.len() >= split + 4 + length {
                    return text[split + 4..].to_string();
                }
            }
            if n == 0 {
                return String::new();
            }
        }
    }

    fn no_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        }
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("436").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_rpc_block_conversion() {
        let block: RpcBlock = serde_json::from_value(json!({
            "number": "0x10",
            "hash": "0xffff",
            "transactions": [
                { "hash": HASH_A, "from": "0xAbC0000000000000000000000000000000000001", "nonce": "0x1" },
                { "hash": HASH_B, "from": null }
            ]
        }))
        .unwrap();
        let block = block.into_block().unwrap();
        assert_eq!(block.number, 16);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].hash.to_string(), HASH_A);
        assert_eq!(block.transactions[1].from, None);
    }

    #[tokio::test]
    async fn test_block_number_over_http() {
        let (url, server) = serve(vec![r#"{"jsonrpc":"2.0","id":1,"result":"0x2a"}"#.to_string()]).await;
        let ledger = RpcLedger::new(url, no_retry()).unwrap();

        assert_eq!(ledger.block_number().await.unwrap(), 42);

        let requests = server.await.unwrap();
        let request: Value = serde_json::from_str(&requests[0]).unwrap();
        assert_eq!(request["method"], "eth_blockNumber");
        assert_eq!(request["jsonrpc"], "2.0");
    }

    #[tokio::test]
    async fn test_block_with_transactions_over_http() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "number": "0x2a", "transactions": [{ "hash": HASH_A, "from": "0x01" }] }
        })
        .to_string();
        let (url, server) = serve(vec![body]).await;
        let ledger = RpcLedger::new(url, no_retry()).unwrap();

        let block = ledger.block_with_transactions(42).await.unwrap();
        assert_eq!(block.number, 42);
        assert_eq!(block.transactions[0].from.as_deref(), Some("0x01"));

        let request: Value = serde_json::from_str(&server.await.unwrap()[0]).unwrap();
        assert_eq!(request["method"], "eth_getBlockByNumber");
        assert_eq!(request["params"], json!(["0x2a", true]));
    }

    #[tokio::test]
    async fn test_rpc_error_object() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
        let (url, _server) = serve(vec![body.to_string()]).await;
        let ledger = RpcLedger::new(url, no_retry()).unwrap();

        match ledger.block_number().await {
            Err(Error::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "method not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_block_is_an_error() {
        let (url, _server) = serve(vec![r#"{"jsonrpc":"2.0","id":1,"result":null}"#.to_string()]).await;
        let ledger = RpcLedger::new(url, no_retry()).unwrap();
        assert!(ledger.block_with_transactions(7).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let ledger = RpcLedger::new(url, no_retry()).unwrap();
        assert!(matches!(ledger.block_number().await, Err(Error::Network(_))));
    }
}

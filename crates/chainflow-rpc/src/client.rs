//! JSON-RPC 2.0 chain client.

use chainflow_core::{ChainflowError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A transaction receipt as reported by the chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: String,
    /// Hex-encoded block number the transaction was included in.
    pub block_number: String,
    /// Hex-encoded execution status; `0x1` means success.
    pub status: String,
}

impl TransactionReceipt {
    /// Whether the transaction executed successfully.
    pub fn success(&self) -> bool {
        self.status == "0x1"
    }

    /// The inclusion height as an integer.
    pub fn block_height(&self) -> Result<u64> {
        parse_hex_u64(&self.block_number)
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Client for a chain node's JSON-RPC surface.
#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    http: reqwest::Client,
}

impl RpcClient {
    /// Create a client for the given endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Fetch the receipt for a transaction.
    ///
    /// Returns `Ok(None)` while the transaction is not yet included; absence
    /// is not an error.
    pub async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", vec![Value::String(tx_hash.to_string())])
            .await?;

        match result {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let receipt: TransactionReceipt = serde_json::from_value(value)?;
                debug!(tx = %tx_hash, status = %receipt.status, block = %receipt.block_number, "receipt fetched");
                Ok(Some(receipt))
            }
        }
    }

    /// Fetch the current chain height.
    pub async fn block_number(&self) -> Result<u64> {
        let result = self
            .call("eth_blockNumber", Vec::new())
            .await?
            .ok_or_else(|| ChainflowError::Rpc("empty eth_blockNumber result".to_string()))?;
        let hex = result
            .as_str()
            .ok_or_else(|| ChainflowError::Rpc("non-string block number".to_string()))?;
        parse_hex_u64(hex)
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Option<Value>> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .http
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainflowError::Rpc(format!("{method}: {e}")))?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainflowError::Rpc(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(ChainflowError::Rpc(format!(
                "{method}: {} (code {})",
                err.message, err.code
            )));
        }
        Ok(body.result)
    }
}

/// Parse a `0x`-prefixed hex integer.
pub fn parse_hex_u64(hex: &str) -> Result<u64> {
    let stripped = hex
        .strip_prefix("0x")
        .ok_or_else(|| ChainflowError::Rpc(format!("missing 0x prefix: {hex}")))?;
    u64::from_str_radix(stripped, 16)
        .map_err(|e| ChainflowError::Rpc(format!("bad hex integer {hex}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("0x1a4").unwrap(), 420);
        assert!(parse_hex_u64("1a4").is_err());
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_receipt_success_flag() {
        let receipt: TransactionReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x1"
        }))
        .unwrap();
        assert!(receipt.success());
        assert_eq!(receipt.block_height().unwrap(), 16);

        let reverted: TransactionReceipt = serde_json::from_value(serde_json::json!({
            "blockNumber": "0x10",
            "status": "0x0"
        }))
        .unwrap();
        assert!(!reverted.success());
    }
}

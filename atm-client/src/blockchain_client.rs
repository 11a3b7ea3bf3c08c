/// JSON-RPC wallet provider
///
/// This module provides HTTP-based JSON-RPC communication with an Ethereum
/// node or wallet endpoint, implementing the EIP-1193 methods the ATM needs.
use crate::blockchain::{Address, Bytes, CallRequest, Receipt, TxHash};
use crate::errors::{AtmError, AtmResult};
use crate::provider::WalletProvider;
use alloy_primitives::U64;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// EIP-1193 code for a request the user declined.
const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 code for a method the provider does not support.
const UNSUPPORTED_METHOD_CODE: i64 = 4200;
/// JSON-RPC 2.0 code for an unknown method.
const METHOD_NOT_FOUND_CODE: i64 = -32601;
/// Execution-reverted code used by geth, Hardhat and Anvil.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// HTTP client for wallet provider RPC communication
#[derive(Debug)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
    poll_interval: Duration,
    next_id: AtomicU64,
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // fields are populated via serde; not all are read
struct JsonRpcResponse {
    jsonrpc: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
    error: Option<JsonRpcError>,
    id: Option<serde_json::Value>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcError {
    fn is_unsupported_method(&self) -> bool {
        self.code == METHOD_NOT_FOUND_CODE || self.code == UNSUPPORTED_METHOD_CODE
    }
}

impl From<JsonRpcError> for AtmError {
    fn from(error: JsonRpcError) -> Self {
        if error.code == USER_REJECTED_CODE {
            return AtmError::UserRejected(error.message);
        }
        if error.code == EXECUTION_REVERTED_CODE || error.message.to_lowercase().contains("revert")
        {
            return AtmError::Reverted(error.message);
        }
        AtmError::ProviderError(format!("RPC error {}: {}", error.code, error.message))
    }
}

/// Failure of a single RPC round trip.
#[derive(Debug)]
enum RpcFailure {
    Rpc(JsonRpcError),
    Transport(AtmError),
}

impl From<RpcFailure> for AtmError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Rpc(error) => error.into(),
            RpcFailure::Transport(error) => error,
        }
    }
}

/// Receipt object as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: TxHash,
    block_number: Option<U64>,
    status: Option<U64>,
}

impl RpcClient {
    /// Create a new RPC client
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> AtmResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AtmError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RpcClient {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    /// Make a JSON-RPC call and return the raw `result` value
    async fn rpc_value(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcFailure> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        log::debug!("rpc -> {} (id {})", method, request.id);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RpcFailure::Transport(AtmError::NetworkError(format!(
                    "HTTP request failed: {}",
                    e
                )))
            })?;

        if !response.status().is_success() {
            return Err(RpcFailure::Transport(AtmError::NetworkError(format!(
                "HTTP error: {}",
                response.status()
            ))));
        }

        let rpc_response: JsonRpcResponse = response.json().await.map_err(|e| {
            RpcFailure::Transport(AtmError::InvalidResponse(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        match rpc_response.error {
            Some(error) => Err(RpcFailure::Rpc(error)),
            None => Ok(rpc_response.result),
        }
    }

    /// Make a JSON-RPC call whose result must be present
    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AtmResult<T> {
        let value = self.rpc_value(method, params).await?;
        if value.is_null() {
            return Err(AtmError::InvalidResponse(
                "No result in RPC response".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl WalletProvider for RpcClient {
    async fn accounts(&self) -> AtmResult<Vec<Address>> {
        self.rpc_call("eth_accounts", serde_json::json!([])).await
    }

    async fn request_accounts(&self) -> AtmResult<Vec<Address>> {
        match self
            .rpc_value("eth_requestAccounts", serde_json::json!([]))
            .await
        {
            Ok(value) => Ok(serde_json::from_value(value)?),
            // Dev nodes hold unlocked accounts and skip the prompt entirely
            Err(RpcFailure::Rpc(error)) if error.is_unsupported_method() => {
                log::debug!("eth_requestAccounts unsupported, using eth_accounts");
                self.accounts().await
            }
            Err(failure) => Err(failure.into()),
        }
    }

    async fn call(&self, request: &CallRequest) -> AtmResult<Bytes> {
        let tx = serde_json::to_value(request)?;
        self.rpc_call("eth_call", serde_json::json!([tx, "latest"]))
            .await
    }

    async fn send_transaction(&self, request: &CallRequest) -> AtmResult<TxHash> {
        let tx = serde_json::to_value(request)?;
        self.rpc_call("eth_sendTransaction", serde_json::json!([tx]))
            .await
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> AtmResult<Option<Receipt>> {
        let value = self
            .rpc_value(
                "eth_getTransactionReceipt",
                serde_json::json!([hash]),
            )
            .await?;
        parse_receipt(value)
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Decode a receipt result; `null` means the transaction is still pending.
fn parse_receipt(value: serde_json::Value) -> AtmResult<Option<Receipt>> {
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawReceipt = serde_json::from_value(value)
        .map_err(|e| AtmError::InvalidResponse(format!("Malformed receipt: {}", e)))?;
    // Receipts without a status field predate Byzantium and imply success
    let success = raw.status.map_or(true, |status| status == U64::from(1));
    Ok(Some(Receipt {
        transaction_hash: raw.transaction_hash,
        block_number: raw.block_number.map(|n| n.to::<u64>()),
        success,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_hex() -> String {
        format!("0x{}", "11".repeat(32))
    }

    #[test]
    fn pending_receipt_is_none() {
        assert_eq!(parse_receipt(serde_json::Value::Null).unwrap(), None);
    }

    #[test]
    fn receipt_status_decoded() {
        let mined = serde_json::json!({
            "transactionHash": hash_hex(),
            "blockNumber": "0x2a",
            "status": "0x1",
            "gasUsed": "0x5208"
        });
        let receipt = parse_receipt(mined).unwrap().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(42));
        assert_eq!(receipt.transaction_hash.to_string(), hash_hex());

        let reverted = serde_json::json!({
            "transactionHash": hash_hex(),
            "blockNumber": "0x2b",
            "status": "0x0"
        });
        assert!(!parse_receipt(reverted).unwrap().unwrap().success);
    }

    #[test]
    fn rpc_errors_classified() {
        let rejected: AtmError = JsonRpcError {
            code: USER_REJECTED_CODE,
            message: "User rejected the request.".to_string(),
        }
        .into();
        assert!(rejected.is_user_rejection());

        let reverted: AtmError = JsonRpcError {
            code: -32603,
            message: "Error: VM Exception while processing transaction: reverted".to_string(),
        }
        .into();
        assert!(matches!(reverted, AtmError::Reverted(_)));

        let other: AtmError = JsonRpcError {
            code: -32000,
            message: "nonce too low".to_string(),
        }
        .into();
        assert!(matches!(other, AtmError::ProviderError(msg) if msg.contains("-32000")));

        assert!(JsonRpcError {
            code: METHOD_NOT_FOUND_CODE,
            message: "Method eth_requestAccounts not found".to_string(),
        }
        .is_unsupported_method());
    }

    #[test]
    fn accounts_decoded_from_rpc_result() {
        let raw = serde_json::json!(["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"]);
        let accounts: Vec<Address> = serde_json::from_value(raw).unwrap();
        assert_eq!(
            accounts[0].to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert!(serde_json::from_value::<Vec<Address>>(serde_json::json!(["nope"])).is_err());
    }

    #[test]
    fn malformed_receipt_is_invalid_response() {
        let broken = serde_json::json!({ "transactionHash": "0x1234", "status": "0x1" });
        assert!(matches!(
            parse_receipt(broken),
            Err(AtmError::InvalidResponse(_))
        ));
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn local_client() -> RpcClient {
        RpcClient::new(
            "http://localhost:8545",
            Duration::from_secs(30),
            Duration::from_millis(250),
        )
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires running dev node at localhost:8545"]
    async fn test_real_accounts_call() {
        let client = local_client();
        let result = client.accounts().await;
        assert!(result.is_ok(), "Accounts call should succeed");
    }

    #[tokio::test]
    #[ignore = "requires running dev node at localhost:8545"]
    async fn test_real_request_accounts_falls_back() {
        let client = local_client();
        let accounts = client.request_accounts().await.unwrap();
        assert!(!accounts.is_empty(), "Dev node should expose unlocked accounts");
    }
}

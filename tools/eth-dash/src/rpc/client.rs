//! JSON-RPC client for the node's HTTP endpoint.

use anyhow::{Context, Result};
use chain_state::{parse_hex_u128, parse_hex_u64, Block, BlockId, ChainStateError, Receipt, TxRef};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct JsonRpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("RPC error {code}: {message}")]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// HTTP JSON-RPC client.
pub struct RpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(rpc_url: String) -> Self {
        Self::with_timeout(rpc_url, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a new RPC client with a custom timeout.
    pub fn with_timeout(rpc_url: String, timeout_secs: u64) -> Self {
        // reqwest::Client::new() is the infallible fallback
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            rpc_url,
            request_id: AtomicU64::new(1),
        }
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.rpc_url
    }

    /// Make a JSON-RPC call. A `null` result is returned as `None`.
    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = rpc_response.error {
            return Err(error.into());
        }

        Ok(rpc_response.result)
    }

    /// Make a JSON-RPC call whose result must not be `null`.
    async fn call_required<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R> {
        self.call(method, params)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} response missing result", method))
    }

    /// Raw call returning the result as JSON (`null` when absent).
    pub async fn raw(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        Ok(self.call(method, params).await?.unwrap_or(Value::Null))
    }

    /// eth_blockNumber - Get current block height.
    pub async fn get_block_number(&self) -> Result<u64> {
        let result: String = self.call_required("eth_blockNumber", Vec::<()>::new()).await?;
        Ok(parse_hex_u64(&result)?)
    }

    /// eth_chainId - Get chain ID.
    pub async fn get_chain_id(&self) -> Result<u64> {
        let result: String = self.call_required("eth_chainId", Vec::<()>::new()).await?;
        Ok(parse_hex_u64(&result)?)
    }

    /// eth_getBlockByNumber - Get block by number or tag.
    pub async fn get_block(&self, id: BlockId, full_txs: bool) -> Result<Option<Block>> {
        let result: Option<RawBlock> = self
            .call("eth_getBlockByNumber", (id.to_rpc_param(), full_txs))
            .await?;

        match result {
            Some(raw) => {
                let block = raw
                    .into_block()
                    .with_context(|| format!("Failed to decode block {}", id))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// eth_getTransactionReceipt - Get a receipt by transaction hash.
    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<Receipt>> {
        let result: Option<RawReceipt> = self
            .call("eth_getTransactionReceipt", (tx_hash,))
            .await?;

        match result {
            Some(raw) => Ok(Some(raw.into_receipt()?)),
            None => Ok(None),
        }
    }
}

/// Map an adapter error onto the port's error type.
pub fn to_chain_error(err: anyhow::Error) -> ChainStateError {
    if let Some(rpc) = err.downcast_ref::<JsonRpcError>() {
        return ChainStateError::Rpc {
            code: rpc.code,
            message: rpc.message.clone(),
        };
    }
    if let Some(decode) = err.downcast_ref::<ChainStateError>() {
        return decode.clone();
    }
    if err.chain().any(|cause| cause.is::<serde_json::Error>()) {
        return ChainStateError::Decode(format!("{:#}", err));
    }
    ChainStateError::Transport(format!("{:#}", err))
}

/// Block as delivered by `eth_getBlockByNumber` (hex quantities).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub number: Option<String>,
    pub hash: Option<String>,
    pub parent_hash: String,
    pub timestamp: String,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub base_fee_per_gas: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub extra_data: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RawTx>,
}

/// Transaction entry: a bare hash or a full body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTx {
    Hash(String),
    Full {
        hash: String,
        #[serde(default, rename = "gasPrice")]
        gas_price: Option<String>,
    },
}

impl RawBlock {
    /// Decode hex quantities into a [`Block`].
    pub fn into_block(self) -> Result<Block, ChainStateError> {
        let number = self
            .number
            .as_deref()
            .ok_or_else(|| ChainStateError::Decode("block without number".to_string()))
            .and_then(parse_hex_u64)?;

        let mut block = Block::new(
            number,
            self.hash.unwrap_or_default(),
            self.parent_hash,
            parse_hex_u64(&self.timestamp)?,
        );
        block.gas_used = optional_u64(self.gas_used.as_deref())?.unwrap_or(0);
        block.base_fee_per_gas = optional_u128(self.base_fee_per_gas.as_deref())?;
        block.gas_price = optional_u128(self.gas_price.as_deref())?;
        block.difficulty = optional_u128(self.difficulty.as_deref())?;
        block.extra_data = self
            .extra_data
            .as_deref()
            .map(|s| hex::decode(s.trim_start_matches("0x")).unwrap_or_default())
            .unwrap_or_default();
        block.transactions = self
            .transactions
            .into_iter()
            .map(|tx| match tx {
                RawTx::Hash(hash) => TxRef::Hash(hash),
                RawTx::Full { hash, gas_price } => TxRef::Full {
                    hash,
                    gas_price: gas_price.as_deref().and_then(|p| parse_hex_u128(p).ok()),
                },
            })
            .collect();

        Ok(block)
    }
}

/// Receipt as delivered by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    pub block_number: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub gas_used: String,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawReceipt {
    /// Decode hex quantities into a [`Receipt`].
    pub fn into_receipt(self) -> Result<Receipt, ChainStateError> {
        Ok(Receipt {
            transaction_hash: self.transaction_hash,
            block_number: parse_hex_u64(&self.block_number)?,
            from: self.from,
            to: self.to,
            gas_used: parse_hex_u64(&self.gas_used)?,
            effective_gas_price: optional_u128(self.effective_gas_price.as_deref())?,
            // Pre-Byzantium receipts carry no status
            status: self.status.as_deref().map_or(true, |s| parse_hex_u64(s).unwrap_or(0) == 1),
        })
    }
}

fn optional_u64(value: Option<&str>) -> Result<Option<u64>, ChainStateError> {
    value.map(parse_hex_u64).transpose()
}

fn optional_u128(value: Option<&str>) -> Result<Option<u128>, ChainStateError> {
    value.map(parse_hex_u128).transpose()
}

//! # Block Values
//!
//! Immutable block observations plus the node-facing identifiers
//! (`BlockId`, `Receipt`, `NetworkInfo`) the ports exchange.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-encoded 32-byte hash as delivered by the node.
pub type BlockHash = String;

/// A reference to a transaction inside a block.
///
/// Blocks fetched without transaction bodies only carry hashes; full
/// bodies also carry the fields the gas-price fallback needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TxRef {
    /// Full transaction body.
    Full {
        /// Transaction hash.
        hash: String,
        /// Legacy/effective gas price in wei, if the node reported one.
        #[serde(default)]
        gas_price: Option<u128>,
    },
    /// Transaction hash only.
    Hash(String),
}

impl TxRef {
    /// Transaction hash regardless of representation.
    pub fn hash(&self) -> &str {
        match self {
            TxRef::Full { hash, .. } => hash,
            TxRef::Hash(hash) => hash,
        }
    }

    /// Gas price, only available on full bodies.
    pub fn gas_price(&self) -> Option<u128> {
        match self {
            TxRef::Full { gas_price, .. } => *gas_price,
            TxRef::Hash(_) => None,
        }
    }
}

/// A block as observed from the node. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: BlockHash,
    /// Parent block hash.
    pub parent_hash: BlockHash,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Gas used by all transactions.
    pub gas_used: u64,
    /// EIP-1559 base fee.
    #[serde(default)]
    pub base_fee_per_gas: Option<u128>,
    /// Block-level gas price (some nodes report it).
    #[serde(default)]
    pub gas_price: Option<u128>,
    /// Proof-of-work difficulty.
    #[serde(default)]
    pub difficulty: Option<u128>,
    /// Raw extra-data bytes.
    #[serde(default)]
    pub extra_data: Vec<u8>,
    /// Ordered transaction references.
    #[serde(default)]
    pub transactions: Vec<TxRef>,
}

impl Block {
    /// Create a block with the identifying fields set and everything else empty.
    pub fn new(number: u64, hash: impl Into<String>, parent_hash: impl Into<String>, timestamp: u64) -> Self {
        Self {
            number,
            hash: hash.into(),
            parent_hash: parent_hash.into(),
            timestamp,
            gas_used: 0,
            base_fee_per_gas: None,
            gas_price: None,
            difficulty: None,
            extra_data: Vec::new(),
            transactions: Vec::new(),
        }
    }

    /// Number of transactions in the block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Short hash for display.
    pub fn short_hash(&self) -> String {
        if self.hash.len() > 12 {
            format!("{}...", &self.hash[..12])
        } else {
            self.hash.clone()
        }
    }
}

/// Block selector accepted by `get_block`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockId {
    /// A specific block number.
    Number(u64),
    /// Most recent block.
    Latest,
    /// Genesis.
    Earliest,
    /// Pending block.
    Pending,
    /// Latest safe head.
    Safe,
    /// Latest finalized block.
    Finalized,
}

impl BlockId {
    /// JSON-RPC parameter form (`0x..` or tag name).
    pub fn to_rpc_param(&self) -> String {
        match self {
            BlockId::Number(n) => format!("0x{:x}", n),
            BlockId::Latest => "latest".to_string(),
            BlockId::Earliest => "earliest".to_string(),
            BlockId::Pending => "pending".to_string(),
            BlockId::Safe => "safe".to_string(),
            BlockId::Finalized => "finalized".to_string(),
        }
    }
}

impl From<u64> for BlockId {
    fn from(number: u64) -> Self {
        BlockId::Number(number)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Number(n) => write!(f, "#{}", n),
            _ => f.write_str(&self.to_rpc_param()),
        }
    }
}

/// Transaction receipt, reduced to what the dashboard displays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Transaction hash.
    pub transaction_hash: String,
    /// Block containing the transaction.
    pub block_number: u64,
    /// Sender.
    pub from: String,
    /// Recipient, `None` for contract creation.
    pub to: Option<String>,
    /// Gas used by this transaction.
    pub gas_used: u64,
    /// Effective gas price in wei.
    pub effective_gas_price: Option<u128>,
    /// `true` when the transaction succeeded.
    pub status: bool,
}

/// Network identity reported by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Well-known network name, or `unknown`.
    pub name: String,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

impl NetworkInfo {
    /// Build from a chain id, resolving the well-known name.
    pub fn from_chain_id(chain_id: u64) -> Self {
        Self {
            name: network_name(chain_id).to_string(),
            chain_id,
        }
    }
}

/// Well-known network name for a chain id.
pub fn network_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        5 => "goerli",
        17000 => "holesky",
        11155111 => "sepolia",
        560048 => "hoodi",
        _ => "unknown",
    }
}

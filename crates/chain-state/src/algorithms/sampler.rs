//! # Sample Parsing
//!
//! Turns raw, possibly irregular node responses into typed samples.
//! None of these functions fail: malformed input degrades to the
//! defined default (`Unknown`, 0 %, 0).

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::domain::{Block, ChainStateError, ClientVersion, SyncProgress, UNKNOWN};

lazy_static! {
    /// `<name>/v<semver>` prefix of a client identifier.
    static ref VERSION_RE: Regex = Regex::new(r"^([^/]+)/v([\d.]+)").expect("static regex");

    /// Path segment preceding the runtime tag.
    static ref PLATFORM_RE: Regex =
        Regex::new(r"/([\w-]+)/(?:go|dotnet|rustc|java|node)").expect("static regex");
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_u64(s: &str) -> Result<u64, ChainStateError> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Err(ChainStateError::Decode(format!("empty hex quantity: {:?}", s)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainStateError::Decode(format!("invalid hex quantity {:?}: {}", s, e)))
}

/// Parse a `0x`-prefixed hex quantity that may exceed 64 bits.
pub fn parse_hex_u128(s: &str) -> Result<u128, ChainStateError> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Err(ChainStateError::Decode(format!("empty hex quantity: {:?}", s)));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainStateError::Decode(format!("invalid hex quantity {:?}: {}", s, e)))
}

/// Read a quantity that may be a hex string or a JSON number.
pub fn quantity_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => parse_hex_u64(s).ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Interpret an `eth_syncing` response.
///
/// `false` means fully synced. An object with `currentBlock` and
/// `highestBlock` means syncing; anything else reads as 0 %.
pub fn parse_sync_status(raw: &Value) -> SyncProgress {
    match raw {
        Value::Bool(false) => SyncProgress::Synced,
        Value::Object(obj) => {
            let current = obj.get("currentBlock").and_then(quantity_u64);
            let highest = obj.get("highestBlock").and_then(quantity_u64);
            match (current, highest) {
                (Some(current), Some(highest)) => SyncProgress::Syncing { current, highest },
                _ => {
                    tracing::debug!(raw = %raw, "Sync object missing fields");
                    SyncProgress::default()
                }
            }
        }
        other => {
            tracing::debug!(raw = %other, "Unexpected eth_syncing response");
            SyncProgress::default()
        }
    }
}

/// Interpret a `net_peerCount` response (hex string). Malformed reads as 0.
pub fn parse_peer_count(raw: &Value) -> u64 {
    quantity_u64(raw).unwrap_or(0)
}

/// Split a `web3_clientVersion` string into version and platform.
///
/// `Geth/v1.13.5-stable-abcdef/linux-amd64/go1.21.3` yields
/// `Geth/v1.13.5` and `linux-amd64`. Each part that does not match
/// resolves to `Unknown`.
pub fn parse_client_version(raw: &str) -> ClientVersion {
    let version = VERSION_RE
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let platform = PLATFORM_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    ClientVersion { version, platform }
}

/// Hashrate implied by a block and its parent, in hashes per second.
///
/// Zero or negative elapsed time (clock irregularity) yields 0, as does
/// a block without difficulty.
pub fn hashrate(block: &Block, parent: &Block) -> f64 {
    let elapsed = block.timestamp as i128 - parent.timestamp as i128;
    if elapsed <= 0 {
        return 0.0;
    }
    let difficulty = block.difficulty.unwrap_or(0);
    difficulty as f64 / elapsed.max(1) as f64
}

/// Gas price of a block in wei.
///
/// Prefers the base fee, then the block-level gas price, then the mean
/// gas price of the block's full transactions; 0 if none is available.
pub fn gas_price(block: &Block) -> u128 {
    if let Some(base_fee) = block.base_fee_per_gas {
        return base_fee;
    }
    if let Some(price) = block.gas_price {
        return price;
    }

    let prices: Vec<u128> = block.transactions.iter().filter_map(|tx| tx.gas_price()).collect();
    if prices.is_empty() {
        return 0;
    }
    prices.iter().sum::<u128>() / prices.len() as u128
}

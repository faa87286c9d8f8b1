//! # Domain Errors
//!
//! Error types for chain-state aggregation.
//!
//! Not-found is never an error here: lookups return `Ok(None)`. Errors
//! are reserved for transport failures, upstream error objects, and
//! configuration mistakes.

use thiserror::Error;

/// Chain-state error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainStateError {
    /// The connection to the node failed or timed out.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the node
        message: String,
    },

    /// The node answered, but the payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The new-block subscription has ended.
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// A ledger read that needs at least one block.
    #[error("No block observed yet")]
    NoBlockYet,

    /// Backfill gave up on a block number.
    #[error("Backfill of block {number} failed after {attempts} attempts")]
    BackfillExhausted {
        /// Block number that stayed missing
        number: u64,
        /// Attempts made
        attempts: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The session loop panicked or was cancelled from outside.
    #[error("Session task failed: {0}")]
    SessionTask(String),
}

impl ChainStateError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainStateError::Transport(_) | ChainStateError::Rpc { .. })
    }
}

//! RPC module for the node's HTTP JSON-RPC endpoint.

mod client;

pub use client::{to_chain_error, RpcClient};

//! # Algorithms Module
//!
//! Pure functions: sample parsing, gap planning, and display helpers.

pub mod format;
pub mod gap;
pub mod sampler;

pub use format::{capitalize, extra_data_ascii, format_gwei, format_hashrate};
pub use gap::{gap_range, plan_backfill, GapPlan};
pub use sampler::{
    gas_price, hashrate, parse_client_version, parse_hex_u128, parse_hex_u64, parse_peer_count,
    parse_sync_status, quantity_u64,
};

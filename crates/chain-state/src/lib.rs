//! # Chain-State Aggregation
//!
//! Real-time aggregation of an Ethereum node's chain state for a live
//! dashboard.
//!
//! **Architecture:** Hexagonal (domain + ports/adapters)
//!
//! ## Purpose
//!
//! - Keep a deduplicated, bounded, newest-first window of recent blocks
//! - Derive smoothed and point-in-time metrics (hashrate, gas price, peer
//!   count, sync percentage) from noisy node answers
//! - Backfill block numbers skipped by the new-head subscription
//!
//! ## Session Model
//!
//! | Concern | Handling |
//! |---------|----------|
//! | Ownership | One loop owns one `DashboardSession`; no locks |
//! | Ordering | Blocks keyed by number; insertion order never matters |
//! | Stale answers | Samples carry an issue generation; older ones are dropped |
//! | Gaps | Skipped numbers fetched concurrently, 3 attempts each |
//! | Cancellation | Stopping the loop aborts every in-flight fetch |
//!
//! ## Module Structure
//!
//! ```text
//! chain-state/
//! ├── domain/          # Block, BlockLedger, Smoother, samples, errors
//! ├── algorithms/      # Sample parsing, gap planning, display formatting
//! ├── ports/           # ChainStateView (inbound) + NodeClient (outbound)
//! ├── application/     # Backfill, Sampler, PollSchedule, session loop
//! └── config.rs        # ChainStateConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use algorithms::{
    capitalize, extra_data_ascii, format_gwei, format_hashrate, gas_price, hashrate,
    parse_client_version, parse_hex_u128, parse_hex_u64, parse_peer_count, parse_sync_status,
    plan_backfill, GapPlan,
};
pub use application::{
    ClosedGap, DashboardSession, GapTracker, PollSchedule, Sampler, SessionEvent,
    SessionHandle, SessionRunner, SessionView,
};
pub use config::{ChainStateConfig, RetryPolicy};
pub use domain::{
    network_name, Block, BlockId, BlockLedger, ChainStateError, ClientVersion, MetricKind,
    MetricSample, MetricValue, NetworkInfo, Receipt, Smoother, SyncProgress, TxRef,
    DEFAULT_LEDGER_CAPACITY, UNKNOWN,
};
pub use ports::{ChainStateView, DashboardMetrics, MockNode, NodeClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

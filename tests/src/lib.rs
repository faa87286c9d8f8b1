//! # Eth-Dash Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_benchmarks.rs  # Ledger insert / snapshot throughput
//! └── src/
//!     └── integration/          # Whole-session flows against a mock node
//!         ├── session_flows.rs  # subscription → ledger → backfill → view
//!         ├── sampling_flows.rs # polled metrics, stale discard, cadence
//!         └── property_flows.rs # ledger invariants under arbitrary head jumps
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p eth-dash-tests
//!
//! # By category
//! cargo test -p eth-dash-tests integration::session_flows
//!
//! # Benchmarks
//! cargo bench -p eth-dash-tests
//! ```

pub mod integration;

//! # Chain-State Configuration
//!
//! Ledger size, smoothing windows, backfill retry policy and poll cadence
//! for one dashboard session.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{ChainStateError, DEFAULT_LEDGER_CAPACITY};

/// Default number of attempts per backfilled block.
pub const DEFAULT_BACKFILL_ATTEMPTS: u32 = 3;

/// Session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainStateConfig {
    /// Blocks retained by the ledger.
    pub ledger_capacity: usize,

    /// Blocks fetched at startup to seed the ledger.
    pub seed_blocks: usize,

    /// Fetch full transaction bodies with each block.
    pub full_transactions: bool,

    /// Attempts per backfilled block before it is left as a hole.
    pub backfill_attempts: u32,

    /// Fixed delay between backfill attempts, in milliseconds.
    pub backfill_retry_delay_ms: u64,

    /// Base timer tick, in milliseconds.
    pub base_tick_ms: u64,

    /// `eth_syncing` period, in milliseconds.
    pub sync_interval_ms: u64,

    /// `net_peerCount` period, in milliseconds.
    pub peers_interval_ms: u64,

    /// `web3_clientVersion` period, in milliseconds.
    pub version_interval_ms: u64,

    /// Network info period, in milliseconds.
    pub network_interval_ms: u64,

    /// Samples averaged for hashrate.
    pub hashrate_window: usize,

    /// Samples averaged for gas price.
    pub gas_price_window: usize,

    /// Samples averaged for peer count.
    pub peers_window: usize,
}

impl Default for ChainStateConfig {
    fn default() -> Self {
        Self {
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            seed_blocks: 10,
            full_transactions: false,
            backfill_attempts: DEFAULT_BACKFILL_ATTEMPTS,
            backfill_retry_delay_ms: 250,
            base_tick_ms: 200,
            sync_interval_ms: 1_000,
            peers_interval_ms: 1_000,
            version_interval_ms: 5_000,
            network_interval_ms: 60_000,
            hashrate_window: 10,
            gas_price_window: 10,
            peers_window: 5,
        }
    }
}

impl ChainStateConfig {
    /// Create a config for testing (small windows, fast timers).
    pub fn for_testing() -> Self {
        Self {
            ledger_capacity: 20,
            seed_blocks: 0,
            full_transactions: false,
            backfill_attempts: DEFAULT_BACKFILL_ATTEMPTS,
            backfill_retry_delay_ms: 10,
            base_tick_ms: 50,
            sync_interval_ms: 100,
            peers_interval_ms: 100,
            version_interval_ms: 500,
            network_interval_ms: 1_000,
            hashrate_window: 3,
            gas_price_window: 3,
            peers_window: 3,
        }
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<(), ChainStateError> {
        if self.ledger_capacity == 0 {
            return Err(ChainStateError::Config("ledger_capacity must be at least 1".to_string()));
        }
        if self.base_tick_ms == 0 {
            return Err(ChainStateError::Config("base_tick_ms must be at least 1".to_string()));
        }
        if self.backfill_attempts == 0 {
            return Err(ChainStateError::Config("backfill_attempts must be at least 1".to_string()));
        }
        if self.seed_blocks > self.ledger_capacity {
            return Err(ChainStateError::Config(format!(
                "seed_blocks ({}) exceeds ledger_capacity ({})",
                self.seed_blocks, self.ledger_capacity
            )));
        }
        Ok(())
    }

    /// Base timer tick.
    pub fn base_tick(&self) -> Duration {
        Duration::from_millis(self.base_tick_ms)
    }

    /// Backfill retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.backfill_attempts,
            delay: Duration::from_millis(self.backfill_retry_delay_ms),
        }
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        ChainStateConfig::default().retry_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChainStateConfig::default();
        assert_eq!(config.ledger_capacity, 100);
        assert_eq!(config.backfill_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = ChainStateConfig::for_testing();
        assert_eq!(config.seed_blocks, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = ChainStateConfig {
            ledger_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ChainStateError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_seed() {
        let config = ChainStateConfig {
            ledger_capacity: 5,
            seed_blocks: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ChainStateConfig = serde_json::from_str(r#"{"ledger_capacity": 20}"#).unwrap();
        assert_eq!(config.ledger_capacity, 20);
        assert_eq!(config.version_interval_ms, 5_000);
    }

    #[test]
    fn test_retry_policy() {
        let policy = ChainStateConfig::for_testing().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(10));
    }
}

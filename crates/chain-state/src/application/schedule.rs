//! # Poll Schedule
//!
//! One base tick drives every polled metric; each metric fires every
//! `period` ticks. Tick 0 fires all of them.

use std::time::Duration;

use crate::config::ChainStateConfig;
use crate::domain::MetricKind;

/// Per-metric poll periods in units of the base tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollSchedule {
    base_tick: Duration,
    periods: Vec<(MetricKind, u64)>,
}

impl PollSchedule {
    /// Build from configured millisecond intervals, rounding each up to a
    /// whole number of ticks.
    pub fn from_config(config: &ChainStateConfig) -> Self {
        let base_ms = config.base_tick_ms.max(1);
        let ticks = |ms: u64| ms.div_ceil(base_ms).max(1);

        Self {
            base_tick: Duration::from_millis(base_ms),
            periods: vec![
                (MetricKind::SyncStatus, ticks(config.sync_interval_ms)),
                (MetricKind::PeerCount, ticks(config.peers_interval_ms)),
                (MetricKind::ClientVersion, ticks(config.version_interval_ms)),
                (MetricKind::Network, ticks(config.network_interval_ms)),
            ],
        }
    }

    /// Base timer tick.
    pub fn base_tick(&self) -> Duration {
        self.base_tick
    }

    /// Period of `kind` in ticks, if it is polled.
    pub fn period(&self, kind: MetricKind) -> Option<u64> {
        self.periods
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, period)| *period)
    }

    /// Metrics due on `tick`.
    pub fn due(&self, tick: u64) -> Vec<MetricKind> {
        self.periods
            .iter()
            .filter(|(_, period)| tick % period == 0)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::from_config(&ChainStateConfig::default())
    }
}

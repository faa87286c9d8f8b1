//! # Metric Samples
//!
//! Typed point samples produced by the sampler, and the per-metric slot
//! that keeps the last-known-good value.
//!
//! Every sample request is stamped with a generation when it is issued.
//! A slot only accepts a sample newer than the one it holds, so a slow
//! response that completes after a newer one is discarded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::block::NetworkInfo;

/// Literal used when an upstream value cannot be interpreted.
pub const UNKNOWN: &str = "Unknown";

/// Percentage reported when the node says it is fully synced.
pub const FULLY_SYNCED_PERCENT: f64 = 100.0;

/// Highest percentage reported while the node is still syncing.
pub const MAX_SYNCING_PERCENT: f64 = 99.9999;

/// Metrics sampled on the poll timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    /// `eth_syncing`
    SyncStatus,
    /// `net_peerCount`
    PeerCount,
    /// `web3_clientVersion`
    ClientVersion,
    /// `eth_chainId` + name lookup
    Network,
}

impl MetricKind {
    /// All polled metrics.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::SyncStatus,
        MetricKind::PeerCount,
        MetricKind::ClientVersion,
        MetricKind::Network,
    ];

    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::SyncStatus => "sync_status",
            MetricKind::PeerCount => "peer_count",
            MetricKind::ClientVersion => "client_version",
            MetricKind::Network => "network",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sync state reported by `eth_syncing`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SyncProgress {
    /// Node reports `false`.
    Synced,
    /// Node is still catching up.
    Syncing {
        /// Block the node has processed.
        current: u64,
        /// Highest block the node knows of (may be 0).
        highest: u64,
    },
}

impl SyncProgress {
    /// Percentage with four decimals, never 100 unless synced.
    pub fn percentage(&self) -> f64 {
        match *self {
            SyncProgress::Synced => FULLY_SYNCED_PERCENT,
            SyncProgress::Syncing { current, highest } => {
                if highest == 0 {
                    return 0.0;
                }
                let ratio = current as f64 / highest as f64;
                let percent = (ratio * 1_000_000.0).round() / 10_000.0;
                percent.clamp(0.0, MAX_SYNCING_PERCENT)
            }
        }
    }

    /// Whether the node reports itself synced.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncProgress::Synced)
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        SyncProgress::Syncing {
            current: 0,
            highest: 0,
        }
    }
}

/// Client identity parsed from `web3_clientVersion`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientVersion {
    /// Name and semantic version, e.g. `Geth/v1.13.5`.
    pub version: String,
    /// Platform segment, e.g. `linux-amd64`.
    pub platform: String,
}

impl ClientVersion {
    /// Both fields `Unknown`.
    pub fn unknown() -> Self {
        Self {
            version: UNKNOWN.to_string(),
            platform: UNKNOWN.to_string(),
        }
    }
}

impl Default for ClientVersion {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Parsed value of a polled metric.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    /// Sync progress.
    Sync(SyncProgress),
    /// Connected peers.
    Peers(u64),
    /// Client version and platform.
    Version(ClientVersion),
    /// Network identity.
    Network(NetworkInfo),
}

impl MetricValue {
    /// Metric this value belongs to.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Sync(_) => MetricKind::SyncStatus,
            MetricValue::Peers(_) => MetricKind::PeerCount,
            MetricValue::Version(_) => MetricKind::ClientVersion,
            MetricValue::Network(_) => MetricKind::Network,
        }
    }
}

/// A point sample: metric, value, when it was observed, and the
/// generation at which the request was issued.
#[derive(Clone, Debug)]
pub struct MetricSample {
    /// Parsed value.
    pub value: MetricValue,
    /// Completion time.
    pub observed_at: Instant,
    /// Issue stamp.
    pub generation: u64,
}

impl MetricSample {
    /// Create a sample observed now.
    pub fn new(value: MetricValue, generation: u64) -> Self {
        Self {
            value,
            observed_at: Instant::now(),
            generation,
        }
    }

    /// Metric this sample belongs to.
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

/// Last-known-good value of one metric.
#[derive(Clone, Debug)]
pub struct MetricSlot<T> {
    value: T,
    generation: Option<u64>,
    observed_at: Option<Instant>,
}

impl<T> MetricSlot<T> {
    /// Slot showing `initial` until the first sample is applied.
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            generation: None,
            observed_at: None,
        }
    }

    /// Apply a value issued at `generation`.
    ///
    /// Returns `false`, leaving the slot untouched, when a sample issued at
    /// the same or a later generation has already been applied.
    pub fn apply(&mut self, value: T, generation: u64, observed_at: Instant) -> bool {
        if self.generation.is_some_and(|current| generation <= current) {
            return false;
        }
        self.value = value;
        self.generation = Some(generation);
        self.observed_at = Some(observed_at);
        true
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Generation of the applied value.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// When the applied value was observed.
    pub fn observed_at(&self) -> Option<Instant> {
        self.observed_at
    }

    /// Whether any sample has been applied.
    pub fn is_fresh(&self) -> bool {
        self.generation.is_some()
    }
}

impl<T: Default> Default for MetricSlot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_percentage() {
        assert_eq!(SyncProgress::Synced.percentage(), 100.0);
        assert_eq!(
            SyncProgress::Syncing {
                current: 50,
                highest: 100
            }
            .percentage(),
            50.0
        );
        assert_eq!(
            SyncProgress::Syncing {
                current: 100,
                highest: 0
            }
            .percentage(),
            0.0
        );
    }

    #[test]
    fn test_sync_percentage_never_reports_done_while_syncing() {
        let progress = SyncProgress::Syncing {
            current: 100,
            highest: 100,
        };
        assert_eq!(progress.percentage(), MAX_SYNCING_PERCENT);

        let ahead = SyncProgress::Syncing {
            current: 120,
            highest: 100,
        };
        assert_eq!(ahead.percentage(), MAX_SYNCING_PERCENT);
    }

    #[test]
    fn test_sync_percentage_four_decimals() {
        let progress = SyncProgress::Syncing {
            current: 1,
            highest: 3,
        };
        assert_eq!(progress.percentage(), 33.3333);
    }

    #[test]
    fn test_slot_discards_stale_generation() {
        let now = Instant::now();
        let mut slot = MetricSlot::new(0u64);
        assert!(!slot.is_fresh());

        assert!(slot.apply(12, 2, now));
        assert!(!slot.apply(9, 1, now));
        assert!(!slot.apply(10, 2, now));
        assert_eq!(*slot.get(), 12);

        assert!(slot.apply(15, 3, now));
        assert_eq!(*slot.get(), 15);
        assert_eq!(slot.generation(), Some(3));
    }

    #[test]
    fn test_metric_value_kind() {
        assert_eq!(MetricValue::Peers(3).kind(), MetricKind::PeerCount);
        assert_eq!(
            MetricValue::Version(ClientVersion::unknown()).kind(),
            MetricKind::ClientVersion
        );
        assert_eq!(MetricKind::SyncStatus.to_string(), "sync_status");
    }
}

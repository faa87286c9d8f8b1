//! # Inbound Ports
//!
//! What the aggregation core exposes to a presenter.

use serde::Serialize;

use crate::domain::{Block, ClientVersion, NetworkInfo, SyncProgress};

/// Point-in-time and smoothed metric values for display.
///
/// `None` means the metric has not been sampled successfully yet; the
/// presenter shows it as blank or `Unknown`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    /// Latest sync progress.
    pub sync: Option<SyncProgress>,
    /// Latest peer count.
    pub peers: Option<u64>,
    /// Smoothed peer count.
    pub peers_avg: f64,
    /// Client version and platform.
    pub version: ClientVersion,
    /// Network identity.
    pub network: Option<NetworkInfo>,
    /// Smoothed hashrate (H/s).
    pub hashrate: f64,
    /// Smoothed gas price (wei).
    pub gas_price_wei: f64,
    /// Numbers missing between the ledger's tail and head.
    pub holes: Vec<u64>,
}

impl DashboardMetrics {
    /// Sync percentage, 0 when unavailable.
    pub fn sync_percent(&self) -> f64 {
        self.sync.map(|s| s.percentage()).unwrap_or(0.0)
    }

    /// Whether the node reports itself synced.
    pub fn is_synced(&self) -> bool {
        self.sync.is_some_and(|s| s.is_synced())
    }
}

/// Read-only view of a session's chain state - inbound port.
pub trait ChainStateView {
    /// Blocks ordered newest first.
    fn snapshot(&self) -> Vec<Block>;

    /// Highest block held, if any.
    fn head(&self) -> Option<&Block>;

    /// Current metric values.
    fn metrics(&self) -> DashboardMetrics;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_metrics_read_as_defaults() {
        let metrics = DashboardMetrics::default();
        assert_eq!(metrics.sync_percent(), 0.0);
        assert!(!metrics.is_synced());
        assert_eq!(metrics.version, ClientVersion::unknown());
        assert!(metrics.peers.is_none());
    }

    #[test]
    fn test_synced_metrics() {
        let metrics = DashboardMetrics {
            sync: Some(SyncProgress::Synced),
            ..Default::default()
        };
        assert_eq!(metrics.sync_percent(), 100.0);
        assert!(metrics.is_synced());
    }
}

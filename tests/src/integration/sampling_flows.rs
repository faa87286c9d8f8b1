//! # Sampling Flows
//!
//! Polled metrics through a running session: parsing, cadence, stale
//! discard and last-known-good retention.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chain_state::{
        ChainStateConfig, ChainStateError, ClientVersion, MetricKind, MockNode, NetworkInfo,
        PollSchedule, SessionEvent, SessionRunner, SyncProgress,
    };
    use serde_json::json;

    fn config() -> ChainStateConfig {
        ChainStateConfig::for_testing()
    }

    /// Every metric reaches the view with its parsed value.
    #[tokio::test(start_paused = true)]
    async fn test_all_metrics_reach_the_view() {
        let node = MockNode::new();
        node.set_chain_id(17000);
        node.set_raw(
            "eth_syncing",
            json!({"currentBlock": "0x32", "highestBlock": "0x64"}),
        );
        node.set_raw("net_peerCount", json!("0x19"));
        node.set_raw(
            "web3_clientVersion",
            json!("Geth/v1.13.5-stable-abcdef/linux-amd64/go1.21.3"),
        );

        let handle = SessionRunner::spawn(Arc::new(node), config()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let metrics = handle.view().metrics;
        assert_eq!(
            metrics.sync,
            Some(SyncProgress::Syncing {
                current: 50,
                highest: 100
            })
        );
        assert_eq!(metrics.sync_percent(), 50.0);
        assert_eq!(metrics.peers, Some(25));
        assert_eq!(metrics.peers_avg, 25.0);
        assert_eq!(
            metrics.version,
            ClientVersion {
                version: "Geth/v1.13.5".to_string(),
                platform: "linux-amd64".to_string(),
            }
        );
        assert_eq!(metrics.network, Some(NetworkInfo::from_chain_id(17000)));
        assert_eq!(metrics.network.map(|n| n.name), Some("holesky".to_string()));

        handle.stop().await.unwrap();
    }

    /// An unrecognised client string reads as `Unknown`, not an error.
    #[tokio::test(start_paused = true)]
    async fn test_unparseable_version_is_unknown() {
        let node = MockNode::new();
        node.set_raw("web3_clientVersion", json!("some-custom-client"));

        let handle = SessionRunner::spawn(Arc::new(node), config()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(handle.view().metrics.version, ClientVersion::unknown());
        handle.stop().await.unwrap();
    }

    /// A slow answer from an older poll never overwrites a newer one.
    #[tokio::test(start_paused = true)]
    async fn test_late_version_answer_discarded() {
        let node = MockNode::new();
        node.script_raw(
            "web3_clientVersion",
            Duration::from_secs(2),
            Ok(json!("Erigon/v2.0.0-stable/linux-arm64/go1.20")),
        );
        node.script_raw(
            "web3_clientVersion",
            Duration::ZERO,
            Ok(json!("Geth/v1.13.5-stable-abcdef/linux-amd64/go1.21.3")),
        );
        node.set_raw(
            "web3_clientVersion",
            json!("Geth/v1.13.5-stable-abcdef/linux-amd64/go1.21.3"),
        );

        let handle = SessionRunner::spawn(Arc::new(node), config()).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        let version = handle.view().metrics.version;
        assert_eq!(version.version, "Geth/v1.13.5");
        assert_eq!(version.platform, "linux-amd64");

        handle.stop().await.unwrap();
    }

    /// A failing poll reports the failure and keeps the last good value.
    #[tokio::test(start_paused = true)]
    async fn test_peer_failure_keeps_last_good_value() {
        let node = MockNode::new();
        node.set_raw("net_peerCount", json!("0x4"));

        let mut handle = SessionRunner::spawn(Arc::new(node.clone()), config()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.view().metrics.peers, Some(4));
        while handle.try_next_event().is_some() {}

        node.script_raw(
            "net_peerCount",
            Duration::ZERO,
            Err(ChainStateError::Transport("connection reset".to_string())),
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(handle.view().metrics.peers, Some(4));
        let mut failed = false;
        while let Some(event) = handle.try_next_event() {
            if let SessionEvent::SampleFailed { kind, error } = event {
                failed |= kind == MetricKind::PeerCount && error.contains("connection reset");
            }
        }
        assert!(failed);

        handle.stop().await.unwrap();
    }

    /// The default cadences translate to whole ticks of the base tick.
    #[test]
    fn test_default_cadence() {
        let schedule = PollSchedule::from_config(&ChainStateConfig::default());
        assert_eq!(schedule.period(MetricKind::SyncStatus), Some(5));
        assert_eq!(schedule.period(MetricKind::ClientVersion), Some(25));
        assert_eq!(schedule.period(MetricKind::Network), Some(300));
        assert_eq!(schedule.due(0).len(), 4);
        assert_eq!(schedule.due(5), vec![MetricKind::SyncStatus, MetricKind::PeerCount]);
    }
}

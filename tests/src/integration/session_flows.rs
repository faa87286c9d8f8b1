//! # Session Flows
//!
//! subscription → ledger → backfill → view, end to end against a mock node.
//!
//! Every test runs on a paused clock, so retries and poll cadences advance
//! deterministically.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chain_state::ports::ALWAYS_FAIL;
    use chain_state::{
        ChainStateConfig, ChainStateView, MockNode, SessionEvent, SessionHandle, SessionRunner,
        SessionView,
    };
    use serde_json::json;
    use tokio::sync::mpsc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Node with a linked chain and quiet answers for every polled metric.
    fn quiet_node(range: std::ops::RangeInclusive<u64>) -> MockNode {
        let node = MockNode::with_chain(range);
        node.set_raw("eth_syncing", json!(false));
        node.set_raw("net_peerCount", json!("0x3"));
        node.set_raw(
            "web3_clientVersion",
            json!("Geth/v1.13.5-stable-abcdef/linux-amd64/go1.21.3"),
        );
        node
    }

    /// Start a session fed by a test-controlled subscription.
    fn start(node: &MockNode, config: ChainStateConfig) -> (SessionHandle, mpsc::Sender<u64>) {
        let (tx, rx) = mpsc::channel(64);
        node.with_subscription(rx);
        let handle = SessionRunner::spawn(Arc::new(node.clone()), config).unwrap();
        (handle, tx)
    }

    fn numbers(view: &SessionView) -> Vec<u64> {
        view.snapshot().iter().map(|b| b.number).collect()
    }

    fn drain(handle: &mut SessionHandle) -> Vec<SessionEvent> {
        std::iter::from_fn(|| handle.try_next_event()).collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // =============================================================================
    // INTEGRATION TESTS: HEADS, GAPS, HOLES
    // =============================================================================

    /// A skipped range is fetched, a flaky block recovers within its retry
    /// budget, and the metrics see only head-raising blocks.
    #[tokio::test(start_paused = true)]
    async fn test_gap_with_flaky_block_fills_completely() {
        let node = quiet_node(90..=110);
        let (mut handle, tx) = start(&node, ChainStateConfig::for_testing());

        tx.send(100).await.unwrap();
        settle().await;
        tx.send(101).await.unwrap();
        settle().await;

        node.fail_block(103, 2);
        tx.send(105).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let view = handle.view();
        assert_eq!(numbers(&view), vec![105, 104, 103, 102, 101, 100]);
        assert!(view.metrics.holes.is_empty());
        assert_eq!(node.block_calls(103), 3);

        let metrics = view.metrics();
        assert_eq!(metrics.hashrate, 100.0);
        assert_eq!(metrics.gas_price_wei, 1_000_000_000.0);

        let events = drain(&mut handle);
        assert!(events.contains(&SessionEvent::GapOpened {
            from: 101,
            to: 105,
            requested: 3,
        }));
        assert!(events.contains(&SessionEvent::BlockAdded {
            number: 103,
            backfilled: true,
        }));
        assert!(events.contains(&SessionEvent::GapClosed {
            from: 101,
            to: 105,
            holes: vec![],
        }));

        handle.stop().await.unwrap();
    }

    /// A permanently failing number stays a hole; later heads still land.
    #[tokio::test(start_paused = true)]
    async fn test_hole_survives_later_heads() {
        let node = quiet_node(1..=50);
        node.fail_block(22, ALWAYS_FAIL);
        let (mut handle, tx) = start(&node, ChainStateConfig::for_testing());

        tx.send(20).await.unwrap();
        settle().await;
        tx.send(24).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(25).await.unwrap();
        settle().await;

        let view = handle.view();
        assert_eq!(numbers(&view), vec![25, 24, 23, 21, 20]);
        assert_eq!(view.metrics.holes, vec![22]);
        assert_eq!(node.block_calls(22), 3);
        assert!(drain(&mut handle).contains(&SessionEvent::GapClosed {
            from: 20,
            to: 24,
            holes: vec![22],
        }));

        let session = handle.stop().await.unwrap();
        assert!(!session.holds(22));
    }

    /// Over a long run the ledger keeps exactly the newest `capacity`
    /// blocks, strictly descending.
    #[tokio::test(start_paused = true)]
    async fn test_long_run_respects_capacity() {
        let node = quiet_node(1..=80);
        let config = ChainStateConfig::for_testing();
        let capacity = config.ledger_capacity as u64;
        let (handle, tx) = start(&node, config);

        for number in 1..=80 {
            tx.send(number).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        settle().await;

        let view = handle.view();
        let expected: Vec<u64> = (81 - capacity..=80).rev().collect();
        assert_eq!(numbers(&view), expected);
        assert!(view.snapshot().windows(2).all(|w| w[0].number > w[1].number));

        handle.stop().await.unwrap();
    }

    /// Gaps wider than the ledger only fetch what the ledger would keep.
    #[tokio::test(start_paused = true)]
    async fn test_wide_gap_only_fetches_retained_numbers() {
        let node = quiet_node(1..=200);
        let config = ChainStateConfig::for_testing();
        let capacity = config.ledger_capacity as u64;
        let (handle, tx) = start(&node, config);

        tx.send(10).await.unwrap();
        settle().await;
        tx.send(200).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let view = handle.view();
        assert_eq!(view.snapshot().len() as u64, capacity);
        assert_eq!(view.head().map(|b| b.number), Some(200));
        assert_eq!(node.block_calls(100), 0);

        handle.stop().await.unwrap();
    }

    /// Losing the subscription switches to head polling without losing
    /// the ledger.
    #[tokio::test(start_paused = true)]
    async fn test_subscription_loss_falls_back_to_polling() {
        let node = quiet_node(1..=30);
        let (mut handle, tx) = start(&node, ChainStateConfig::for_testing());

        tx.send(30).await.unwrap();
        settle().await;
        drop(tx);
        settle().await;
        assert!(drain(&mut handle).contains(&SessionEvent::SubscriptionClosed));

        node.insert_block(MockNode::chain_block(31));
        node.insert_block(MockNode::chain_block(32));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let view = handle.view();
        assert_eq!(view.head().map(|b| b.number), Some(32));
        assert!(numbers(&view).starts_with(&[32, 31, 30]));

        handle.stop().await.unwrap();
    }

    /// Seeding and the live stream agree on the ledger contents.
    #[tokio::test(start_paused = true)]
    async fn test_seed_then_stream() {
        let node = quiet_node(1..=60);
        let config = ChainStateConfig {
            seed_blocks: 10,
            ..ChainStateConfig::for_testing()
        };
        let (handle, tx) = start(&node, config);
        settle().await;

        assert_eq!(handle.view().snapshot().len(), 10);

        node.insert_block(MockNode::chain_block(61));
        tx.send(61).await.unwrap();
        settle().await;

        let view = handle.view();
        let expected: Vec<u64> = (51..=61).rev().collect();
        assert_eq!(numbers(&view), expected);
        assert_eq!(view.metrics().hashrate, 100.0);

        handle.stop().await.unwrap();
    }
}

//! # Property Flows
//!
//! Rising head sequences, with jumps from one block to millions, fed
//! through a session with some backfill numbers failing for good. The
//! ledger must stay deduplicated, ordered and bounded, and the reported
//! holes must be exactly the failed numbers still inside the window.

#[cfg(test)]
mod tests {
    use chain_state::{ChainStateConfig, ChainStateView, DashboardSession, MockNode};
    use proptest::prelude::*;

    fn config(capacity: usize) -> ChainStateConfig {
        ChainStateConfig {
            ledger_capacity: capacity,
            ..ChainStateConfig::for_testing()
        }
    }

    fn head_step() -> impl Strategy<Value = u64> {
        prop_oneof![
            4 => 1u64..4,
            1 => 4u64..5_000_000,
        ]
    }

    proptest! {
        #[test]
        fn prop_rising_heads_keep_ledger_consistent(
            start in 0u64..1_000,
            steps in proptest::collection::vec(head_step(), 1..40),
            capacity in 2usize..40,
            fail_every in 2u64..30,
        ) {
            let mut session = DashboardSession::new(&config(capacity));
            let fails = |n: u64| n % fail_every == 0;

            let mut head = start;
            session.ingest_block(MockNode::chain_block(head));

            for step in steps {
                head += step;
                let outcome = session.ingest_block(MockNode::chain_block(head));
                prop_assert!(outcome.new_head);
                prop_assert!(outcome.gap.missing.len() < capacity);

                for number in outcome.gap.missing {
                    if !fails(number) {
                        session.add_backfilled(MockNode::chain_block(number));
                    }
                }

                let snapshot = session.snapshot();
                prop_assert!(snapshot.len() <= capacity);
                prop_assert!(snapshot.windows(2).all(|w| w[0].number > w[1].number));
                prop_assert_eq!(session.head_number(), Some(head));

                let holes = session.metrics().holes;
                prop_assert!(holes.len() < capacity);
                prop_assert!(holes.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(holes.iter().all(|&n| fails(n)));
                prop_assert!(holes.iter().all(|&n| n + capacity as u64 > head));
            }
        }
    }
}

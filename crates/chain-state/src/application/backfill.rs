//! # Gap Backfill
//!
//! Fetches block numbers skipped by the subscription. Each fetch is
//! retried a bounded number of times and then reported as a hole.
//!
//! [`GapTracker`] keeps every gap open until each of its numbers has
//! either landed or exhausted its retries, in whatever order the fetches
//! complete.

use std::collections::BTreeSet;

use crate::config::RetryPolicy;
use crate::domain::{Block, BlockId, ChainStateError};
use crate::ports::NodeClient;

/// Fetch one block, retrying transport failures and not-found answers.
pub async fn fetch_with_retry<N: NodeClient + ?Sized>(
    client: &N,
    number: u64,
    include_transactions: bool,
    policy: RetryPolicy,
) -> Result<Block, ChainStateError> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match client
            .get_block(BlockId::Number(number), include_transactions)
            .await
        {
            Ok(Some(block)) => return Ok(block),
            Ok(None) => {
                tracing::debug!(number, attempt, "block not available yet");
            }
            Err(e) => {
                tracing::debug!(number, attempt, error = %e, "block fetch failed");
            }
        }

        if attempt < attempts && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(ChainStateError::BackfillExhausted { number, attempts })
}

/// A gap whose fetches have all completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosedGap {
    /// Head before the jump.
    pub from: u64,
    /// Head that opened the gap.
    pub to: u64,
    /// Numbers that could not be fetched, ascending.
    pub holes: Vec<u64>,
}

impl ClosedGap {
    /// Whether every awaited number was fetched.
    pub fn is_complete(&self) -> bool {
        self.holes.is_empty()
    }
}

#[derive(Debug)]
struct OpenGap {
    from: u64,
    to: u64,
    outstanding: BTreeSet<u64>,
    holes: Vec<u64>,
}

/// Gaps awaiting their fetches.
///
/// A number can be awaited by more than one gap, for example when a head
/// fetch for it is still in flight as a later jump skips over it. One
/// completion resolves it everywhere.
#[derive(Debug, Default)]
pub struct GapTracker {
    open: Vec<OpenGap>,
}

impl GapTracker {
    /// Create a tracker with no open gaps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start awaiting `numbers` for the jump from `from` to `to`. An empty
    /// list opens nothing.
    pub fn open(&mut self, from: u64, to: u64, numbers: &[u64]) {
        if numbers.is_empty() {
            return;
        }
        self.open.push(OpenGap {
            from,
            to,
            outstanding: numbers.iter().copied().collect(),
            holes: Vec::new(),
        });
    }

    /// Record that the fetch for `number` finished, `held` telling whether
    /// the block is now in the ledger. Returns the gaps this closed.
    pub fn resolve(&mut self, number: u64, held: bool) -> Vec<ClosedGap> {
        let mut closed = Vec::new();
        self.open.retain_mut(|gap| {
            if gap.outstanding.remove(&number) && !held {
                gap.holes.push(number);
            }
            if !gap.outstanding.is_empty() {
                return true;
            }
            let mut holes = std::mem::take(&mut gap.holes);
            holes.sort_unstable();
            closed.push(ClosedGap {
                from: gap.from,
                to: gap.to,
                holes,
            });
            false
        });
        closed
    }

    /// Whether any open gap still waits on `number`.
    pub fn awaits(&self, number: u64) -> bool {
        self.open.iter().any(|gap| gap.outstanding.contains(&number))
    }

    /// Number of gaps still open.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

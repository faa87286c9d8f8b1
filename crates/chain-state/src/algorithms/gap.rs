//! # Gap Detection
//!
//! Decides which block numbers must be backfilled when the head jumps.

use std::ops::RangeInclusive;

/// Block numbers to backfill after a head advance.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GapPlan {
    /// Numbers to fetch, ascending.
    pub missing: Vec<u64>,
    /// Missing numbers not fetched because they would be evicted at once.
    pub skipped: u64,
}

impl GapPlan {
    /// Whether nothing needs fetching.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Numbers strictly between `previous_head` and `new_head`.
///
/// Empty unless the head advanced by more than one. A stale or
/// reorganised notification (`new_head <= previous_head`) never opens a
/// gap.
pub fn gap_range(previous_head: u64, new_head: u64) -> Option<RangeInclusive<u64>> {
    if new_head <= previous_head.saturating_add(1) {
        return None;
    }
    Some(previous_head + 1..=new_head - 1)
}

/// Plan the backfill for a head advance, fetching only numbers that a
/// ledger of `capacity` entries headed by `new_head` could retain.
pub fn plan_backfill(previous_head: Option<u64>, new_head: u64, capacity: usize) -> GapPlan {
    let Some(previous_head) = previous_head else {
        return GapPlan::default();
    };
    let Some(range) = gap_range(previous_head, new_head) else {
        return GapPlan::default();
    };

    let retain_from = new_head.saturating_sub(capacity.saturating_sub(1) as u64);
    let start = (*range.start()).max(retain_from);
    let skipped = start - *range.start();

    GapPlan {
        missing: (start..=*range.end()).collect(),
        skipped,
    }
}

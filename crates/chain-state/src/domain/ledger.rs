//! # Block Ledger
//!
//! Rolling, deduplicated, bounded window of recently observed blocks.
//!
//! Entries are keyed by block number, so a second delivery of the same
//! number is ignored (first write wins) and insertion order never
//! matters. When the window grows past capacity the lowest numbers are
//! evicted.

use std::collections::BTreeMap;

use super::block::Block;
use super::errors::ChainStateError;

/// Default number of blocks retained by a ledger.
pub const DEFAULT_LEDGER_CAPACITY: usize = 100;

/// Bounded set of recent blocks, one entry per block number.
#[derive(Clone, Debug)]
pub struct BlockLedger {
    blocks: BTreeMap<u64, Block>,
    capacity: usize,
}

impl Default for BlockLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}

impl BlockLedger {
    /// Create an empty ledger. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Create a ledger pre-seeded from an initial batch fetch.
    pub fn seeded(capacity: usize, blocks: impl IntoIterator<Item = Block>) -> Self {
        let mut ledger = Self::new(capacity);
        for block in blocks {
            ledger.add_block(block);
        }
        ledger
    }

    /// Insert `block` unless its number is already held.
    ///
    /// Returns `true` if the block is held after the call. Duplicates
    /// return `false` and leave the ledger untouched; a block older than
    /// a full window is inserted and immediately evicted, also returning
    /// `false`.
    pub fn add_block(&mut self, block: Block) -> bool {
        let number = block.number;
        if self.blocks.contains_key(&number) {
            tracing::trace!(block_number = number, "Duplicate block ignored");
            return false;
        }

        self.blocks.insert(number, block);
        while self.blocks.len() > self.capacity {
            self.blocks.pop_first();
        }

        self.blocks.contains_key(&number)
    }

    /// Block with the highest number held.
    pub fn head(&self) -> Option<&Block> {
        self.blocks.last_key_value().map(|(_, block)| block)
    }

    /// Head, or `NoBlockYet` when the ledger is empty.
    pub fn require_head(&self) -> Result<&Block, ChainStateError> {
        self.head().ok_or(ChainStateError::NoBlockYet)
    }

    /// Highest block number held.
    pub fn head_number(&self) -> Option<u64> {
        self.blocks.last_key_value().map(|(number, _)| *number)
    }

    /// Lowest block number held.
    pub fn tail_number(&self) -> Option<u64> {
        self.blocks.first_key_value().map(|(number, _)| *number)
    }

    /// Blocks ordered newest first.
    pub fn snapshot(&self) -> Vec<Block> {
        self.iter().cloned().collect()
    }

    /// Iterate newest first without cloning.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values().rev()
    }

    /// Look up a block by number.
    pub fn get(&self, number: u64) -> Option<&Block> {
        self.blocks.get(&number)
    }

    /// Whether a block number is held.
    pub fn contains(&self, number: u64) -> bool {
        self.blocks.contains_key(&number)
    }

    /// Numbers missing from the window below the head.
    ///
    /// Only numbers that a full ledger could still hold are scanned, so the
    /// cost is bounded by the capacity however far the head jumped.
    pub fn holes(&self) -> Vec<u64> {
        let (Some(tail), Some(head)) = (self.tail_number(), self.head_number()) else {
            return Vec::new();
        };
        let floor = head.saturating_sub(self.capacity as u64 - 1).max(tail);
        (floor..=head).filter(|n| !self.blocks.contains_key(n)).collect()
    }

    /// Number of blocks held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the ledger holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Maximum number of blocks held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invariants::{invariant_descending, invariant_unique_numbers};
    use proptest::prelude::*;

    fn block(number: u64) -> Block {
        Block::new(number, format!("0x{:064x}", number), format!("0x{:064x}", number.saturating_sub(1)), 1_700_000_000 + number * 12)
    }

    #[test]
    fn test_empty_ledger_has_no_head() {
        let ledger = BlockLedger::new(10);
        assert!(ledger.head().is_none());
        assert!(ledger.is_empty());
        assert_eq!(ledger.require_head(), Err(ChainStateError::NoBlockYet));
        assert!(ledger.snapshot().is_empty());
        assert!(ledger.holes().is_empty());
    }

    #[test]
    fn test_add_block_sets_head() {
        let mut ledger = BlockLedger::new(10);
        assert!(ledger.add_block(block(5)));
        assert!(ledger.add_block(block(7)));
        assert!(ledger.add_block(block(6)));
        assert_eq!(ledger.head_number(), Some(7));
        assert_eq!(ledger.tail_number(), Some(5));
    }

    #[test]
    fn test_duplicate_number_first_write_wins() {
        let mut ledger = BlockLedger::new(10);
        ledger.add_block(block(42));

        let mut replacement = block(42);
        replacement.hash = "0xreorged".to_string();
        assert!(!ledger.add_block(replacement));

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(42).map(|b| b.hash.as_str()), Some(block(42).hash.as_str()));
    }

    #[test]
    fn test_add_block_idempotent() {
        let mut ledger = BlockLedger::new(10);
        ledger.add_block(block(1));
        ledger.add_block(block(2));
        let before = ledger.snapshot();

        ledger.add_block(block(2));
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.head_number(), Some(2));
    }

    #[test]
    fn test_snapshot_descending() {
        let mut ledger = BlockLedger::new(10);
        for n in [3, 9, 1, 4] {
            ledger.add_block(block(n));
        }
        let numbers: Vec<u64> = ledger.snapshot().iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![9, 4, 3, 1]);
    }

    #[test]
    fn test_eviction_drops_lowest_numbers() {
        let mut ledger = BlockLedger::new(3);
        for n in 1..=5 {
            ledger.add_block(block(n));
        }
        let numbers: Vec<u64> = ledger.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![5, 4, 3]);
    }

    #[test]
    fn test_block_older_than_full_window_is_not_retained() {
        let mut ledger = BlockLedger::seeded(3, (10..13).map(block));
        assert!(!ledger.add_block(block(2)));
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.tail_number(), Some(10));
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let mut ledger = BlockLedger::new(0);
        ledger.add_block(block(1));
        ledger.add_block(block(2));
        assert_eq!(ledger.capacity(), 1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.head_number(), Some(2));
    }

    #[test]
    fn test_holes() {
        let ledger = BlockLedger::seeded(10, [101, 102, 104, 105].into_iter().map(block));
        assert_eq!(ledger.holes(), vec![103]);
    }

    #[test]
    fn test_holes_bounded_after_wide_jump() {
        let ledger = BlockLedger::seeded(100, [100, 5_000_000].into_iter().map(block));
        let holes = ledger.holes();
        assert_eq!(holes.len(), 99);
        assert_eq!(holes.first(), Some(&4_999_901));
        assert_eq!(holes.last(), Some(&4_999_999));
    }

    proptest! {
        #[test]
        fn prop_no_duplicate_numbers(numbers in proptest::collection::vec(0u64..50, 0..200), capacity in 1usize..40) {
            let mut ledger = BlockLedger::new(capacity);
            for n in numbers {
                ledger.add_block(block(n));
                let snapshot = ledger.snapshot();
                prop_assert!(invariant_unique_numbers(&snapshot));
                prop_assert!(invariant_descending(&snapshot));
                prop_assert!(ledger.len() <= capacity);
            }
        }

        #[test]
        fn prop_keeps_highest_numbers(capacity in 1usize..50, extra in 1usize..100) {
            let total = capacity + extra;
            let mut ledger = BlockLedger::new(capacity);
            for n in 0..total as u64 {
                ledger.add_block(block(n));
            }
            let numbers: Vec<u64> = ledger.iter().map(|b| b.number).collect();
            let expected: Vec<u64> = ((total - capacity) as u64..total as u64).rev().collect();
            prop_assert_eq!(numbers, expected);
        }

        #[test]
        fn prop_order_independent(mut numbers in proptest::collection::vec(0u64..30, 1..60)) {
            let mut forward = BlockLedger::new(100);
            for n in &numbers {
                forward.add_block(block(*n));
            }
            numbers.reverse();
            let mut backward = BlockLedger::new(100);
            for n in &numbers {
                backward.add_block(block(*n));
            }
            prop_assert_eq!(forward.snapshot(), backward.snapshot());
        }
    }
}

//! # Domain Invariants
//!
//! Rules the ledger output must always satisfy.

use super::block::Block;

/// Invariant: no two entries share a block number.
pub fn invariant_unique_numbers(blocks: &[Block]) -> bool {
    let mut numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
    numbers.sort_unstable();
    numbers.windows(2).all(|pair| pair[0] != pair[1])
}

/// Invariant: entries are ordered newest first.
pub fn invariant_descending(blocks: &[Block]) -> bool {
    blocks.windows(2).all(|pair| pair[0].number > pair[1].number)
}

/// Invariant: the ledger never holds more than its capacity.
pub fn invariant_bounded(len: usize, capacity: usize) -> bool {
    len <= capacity
}

//! # Domain Module
//!
//! Core domain types: blocks, the block ledger, smoothing windows and
//! metric samples.

pub mod block;
pub mod errors;
pub mod invariants;
pub mod ledger;
pub mod samples;
pub mod smoother;

pub use block::*;
pub use errors::*;
pub use invariants::*;
pub use ledger::*;
pub use samples::*;
pub use smoother::*;

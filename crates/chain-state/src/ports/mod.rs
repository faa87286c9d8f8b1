//! # Ports Module
//!
//! Hexagonal architecture ports (inbound view, outbound node client).

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;

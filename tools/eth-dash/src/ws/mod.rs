//! WebSocket module for real-time head notifications.

mod client;

pub use client::{WsClient, WsEvent};

//! WebSocket client for the `newHeads` subscription.

use anyhow::{Context, Result};
use chain_state::parse_hex_u64;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Events received from the WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// New head announced.
    NewHead(u64),
    /// Connection established and subscription sent.
    Connected,
    /// Connection lost.
    Disconnected,
    /// Error occurred.
    Error(String),
}

/// Header fields read from a `newHeads` notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadNotification {
    number: String,
}

/// JSON-RPC request for WebSocket.
#[derive(Debug, Serialize)]
struct WsRequest<T: Serialize> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC subscription response or notification.
#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<SubscriptionParams>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionParams {
    subscription: String,
    result: serde_json::Value,
}

/// Request id used for the `eth_subscribe` call.
const NEW_HEADS_REQUEST_ID: u64 = 1;

/// Tracks the subscription id the node assigned.
#[derive(Debug, Default)]
struct SubscriptionState {
    new_heads_sub: Option<String>,
}

impl SubscriptionState {
    fn register_subscription(&mut self, id: Option<u64>, result: serde_json::Value) {
        if id == Some(NEW_HEADS_REQUEST_ID) {
            self.new_heads_sub = result.as_str().map(str::to_string);
        }
    }

    /// Head number carried by a notification for our subscription.
    fn head_number(&self, params: SubscriptionParams) -> Option<u64> {
        if Some(&params.subscription) != self.new_heads_sub.as_ref() {
            return None;
        }
        let head: HeadNotification = serde_json::from_value(params.result).ok()?;
        parse_hex_u64(&head.number).ok()
    }
}

/// Maximum WebSocket reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Base delay between reconnection attempts (exponential backoff).
const RECONNECT_BASE_DELAY_SECS: u64 = 2;

/// Maximum delay between reconnection attempts.
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// How a single connection ended.
#[derive(Debug, PartialEq, Eq)]
enum ConnectionEnd {
    /// Stop requested or nobody is listening any more.
    Shutdown,
    /// The node closed the socket.
    Closed,
}

/// WebSocket client for the new-head subscription.
pub struct WsClient {
    ws_url: String,
    event_tx: Option<mpsc::Sender<WsEvent>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl WsClient {
    /// Create a new WebSocket client.
    pub fn new(ws_url: String, event_tx: mpsc::Sender<WsEvent>) -> Self {
        Self {
            ws_url,
            event_tx: Some(event_tx),
            shutdown_tx: None,
        }
    }

    /// Start the connection loop in the background. The event sender
    /// moves into the loop, so the receiver closes once the loop ends.
    pub fn start(&mut self) {
        let Some(event_tx) = self.event_tx.take() else {
            return;
        };
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(Self::connection_loop(
            self.ws_url.clone(),
            event_tx,
            shutdown_rx,
        ));
    }

    /// Connection loop with reconnection logic. Ends on shutdown, when the
    /// event receiver is dropped, or after too many failed reconnects.
    async fn connection_loop(
        ws_url: String,
        event_tx: mpsc::Sender<WsEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut reconnect_attempts = 0u32;

        loop {
            let error = match Self::run_connection(&ws_url, &event_tx, &mut shutdown_rx).await {
                Ok(ConnectionEnd::Shutdown) => break,
                Ok(ConnectionEnd::Closed) => {
                    // A connection that got as far as closing cleanly resets the budget
                    reconnect_attempts = 0;
                    "connection closed by node".to_string()
                }
                Err(e) => format!("{:#}", e),
            };

            reconnect_attempts += 1;
            tracing::warn!("WebSocket {} lost: {}", ws_url, error);
            if event_tx.send(WsEvent::Error(error)).await.is_err()
                || event_tx.send(WsEvent::Disconnected).await.is_err()
            {
                break;
            }

            if !Self::should_retry(reconnect_attempts, &event_tx).await {
                break;
            }

            let delay_secs = Self::calculate_backoff_delay(reconnect_attempts);

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(delay_secs)) => {}
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::debug!("WebSocket loop for {} finished", ws_url);
    }

    /// Check if we should retry connection.
    async fn should_retry(attempts: u32, event_tx: &mpsc::Sender<WsEvent>) -> bool {
        if attempts >= MAX_RECONNECT_ATTEMPTS {
            let msg = format!(
                "WebSocket reconnection failed after {} attempts",
                MAX_RECONNECT_ATTEMPTS
            );
            let _ = event_tx.send(WsEvent::Error(msg)).await;
            return false;
        }
        true
    }

    /// Calculate exponential backoff delay.
    fn calculate_backoff_delay(attempts: u32) -> u64 {
        std::cmp::min(
            RECONNECT_BASE_DELAY_SECS.saturating_mul(1 << attempts.min(6)),
            MAX_RECONNECT_DELAY_SECS,
        )
    }

    /// Run a single WebSocket connection.
    async fn run_connection(
        ws_url: &str,
        event_tx: &mpsc::Sender<WsEvent>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Result<ConnectionEnd> {
        let (ws_stream, _) = connect_async(ws_url)
            .await
            .context("Failed to connect to WebSocket")?;

        let (mut write, mut read) = ws_stream.split();

        let new_heads_req = WsRequest {
            jsonrpc: "2.0",
            method: "eth_subscribe",
            params: ("newHeads",),
            id: NEW_HEADS_REQUEST_ID,
        };
        let msg = Message::Text(serde_json::to_string(&new_heads_req)?.into());
        write.send(msg).await.context("Failed to send subscription")?;

        if event_tx.send(WsEvent::Connected).await.is_err() {
            return Ok(ConnectionEnd::Shutdown);
        }

        let mut state = SubscriptionState::default();

        loop {
            let msg = tokio::select! {
                _ = shutdown_rx.recv() => return Ok(ConnectionEnd::Shutdown),
                msg = read.next() => msg,
            };

            match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = Self::handle_text_message(&text, &mut state) {
                        if event_tx.send(event).await.is_err() {
                            return Ok(ConnectionEnd::Shutdown);
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(ConnectionEnd::Closed),
                Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                Some(Ok(_)) => {}
            }
        }
    }

    /// Handle a text message from WebSocket.
    fn handle_text_message(text: &str, state: &mut SubscriptionState) -> Option<WsEvent> {
        let response = serde_json::from_str::<SubscriptionResponse>(text).ok()?;

        if let Some(error) = response.error {
            return Some(WsEvent::Error(error.message));
        }

        if let Some(result) = response.result {
            state.register_subscription(response.id, result);
            return None;
        }

        if response.method.as_deref() == Some("eth_subscription") {
            return response
                .params
                .and_then(|params| state.head_number(params))
                .map(WsEvent::NewHead);
        }

        None
    }

    /// Stop the WebSocket connection.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed() -> SubscriptionState {
        let mut state = SubscriptionState::default();
        let confirm = r#"{"jsonrpc":"2.0","id":1,"result":"0xcd0c3e8af590364c09d0fa6a1210faf5"}"#;
        assert_eq!(WsClient::handle_text_message(confirm, &mut state), None);
        state
    }

    #[test]
    fn test_new_head_notification() {
        let mut state = subscribed();
        let notification = r#"{
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {
                "subscription": "0xcd0c3e8af590364c09d0fa6a1210faf5",
                "result": {
                    "number": "0x12d687",
                    "hash": "0xabc123def456789",
                    "parentHash": "0x000000",
                    "timestamp": "0x60000000"
                }
            }
        }"#;

        assert_eq!(
            WsClient::handle_text_message(notification, &mut state),
            Some(WsEvent::NewHead(1234567))
        );
    }

    #[test]
    fn test_foreign_subscription_ignored() {
        let mut state = subscribed();
        let notification = r#"{"jsonrpc":"2.0","method":"eth_subscription",
            "params":{"subscription":"0xother","result":{"number":"0x1"}}}"#;
        assert_eq!(WsClient::handle_text_message(notification, &mut state), None);
    }

    #[test]
    fn test_subscribe_error_reported() {
        let mut state = SubscriptionState::default();
        let error = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"notifications not supported"}}"#;
        assert_eq!(
            WsClient::handle_text_message(error, &mut state),
            Some(WsEvent::Error("notifications not supported".to_string()))
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(WsClient::calculate_backoff_delay(1), 4);
        assert_eq!(WsClient::calculate_backoff_delay(3), 16);
        assert_eq!(WsClient::calculate_backoff_delay(9), MAX_RECONNECT_DELAY_SECS);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_gives_up_on_shutdown() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut client = WsClient::new("ws://127.0.0.1:9".to_string(), tx);
        client.start();

        assert!(matches!(rx.recv().await, Some(WsEvent::Error(_))));
        assert_eq!(rx.recv().await, Some(WsEvent::Disconnected));

        client.stop().await;
        // The loop exits and drops its sender.
        assert_eq!(rx.recv().await, None);
    }
}

//! Node client backed by the HTTP JSON-RPC endpoint and the WebSocket
//! `newHeads` subscription.

use async_trait::async_trait;
use chain_state::{Block, BlockId, ChainStateError, NetworkInfo, NodeClient, Receipt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::rpc::{to_chain_error, RpcClient};
use crate::ws::{WsClient, WsEvent};

/// Buffered head numbers between the socket and the session.
const HEAD_CHANNEL_CAPACITY: usize = 64;

/// Buffered raw socket events.
const WS_CHANNEL_CAPACITY: usize = 100;

/// Live Ethereum node.
pub struct EthNode {
    rpc: RpcClient,
    ws_url: String,
    status_tx: Option<mpsc::Sender<WsEvent>>,
}

impl EthNode {
    /// Create a client for the given endpoints.
    pub fn new(rpc_url: String, ws_url: String) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
            ws_url,
            status_tx: None,
        }
    }

    /// Also report socket connection changes on `status_tx`.
    pub fn with_status(mut self, status_tx: mpsc::Sender<WsEvent>) -> Self {
        self.status_tx = Some(status_tx);
        self
    }

    /// WebSocket endpoint, if one that can carry a subscription is set.
    fn subscription_url(&self) -> Option<&str> {
        let url = self.ws_url.trim();
        (url.starts_with("ws://") || url.starts_with("wss://")).then_some(url)
    }

    /// Pump socket events until the socket loop ends or the head
    /// receiver is dropped.
    async fn forward_heads(
        mut client: WsClient,
        mut ws_rx: mpsc::Receiver<WsEvent>,
        head_tx: mpsc::Sender<u64>,
        status_tx: Option<mpsc::Sender<WsEvent>>,
    ) {
        loop {
            let event = tokio::select! {
                event = ws_rx.recv() => event,
                _ = head_tx.closed() => break,
            };

            match event {
                Some(WsEvent::NewHead(number)) => {
                    tracing::trace!(block_number = number, "new head");
                    if head_tx.send(number).await.is_err() {
                        break;
                    }
                }
                Some(status) => {
                    if let WsEvent::Error(ref e) = status {
                        tracing::debug!("Subscription error: {}", e);
                    }
                    if let Some(tx) = &status_tx {
                        let _ = tx.try_send(status);
                    }
                }
                None => {
                    tracing::warn!("Head subscription ended");
                    break;
                }
            }
        }

        client.stop().await;
    }
}

#[async_trait]
impl NodeClient for EthNode {
    async fn get_block(
        &self,
        id: BlockId,
        include_transactions: bool,
    ) -> Result<Option<Block>, ChainStateError> {
        self.rpc
            .get_block(id, include_transactions)
            .await
            .map_err(to_chain_error)
    }

    async fn get_block_number(&self) -> Result<u64, ChainStateError> {
        self.rpc.get_block_number().await.map_err(to_chain_error)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Receipt>, ChainStateError> {
        self.rpc
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(to_chain_error)
    }

    async fn get_network_info(&self) -> Result<NetworkInfo, ChainStateError> {
        let chain_id = self.rpc.get_chain_id().await.map_err(to_chain_error)?;
        Ok(NetworkInfo::from_chain_id(chain_id))
    }

    async fn raw_call(&self, method: &str, params: Vec<Value>) -> Result<Value, ChainStateError> {
        self.rpc.raw(method, params).await.map_err(to_chain_error)
    }

    async fn subscribe_new_blocks(&self) -> Result<mpsc::Receiver<u64>, ChainStateError> {
        let Some(ws_url) = self.subscription_url() else {
            tracing::info!("No WebSocket endpoint configured ({:?})", self.ws_url);
            return Err(ChainStateError::SubscriptionClosed);
        };

        let (ws_tx, ws_rx) = mpsc::channel(WS_CHANNEL_CAPACITY);
        let (head_tx, head_rx) = mpsc::channel(HEAD_CHANNEL_CAPACITY);

        let mut client = WsClient::new(ws_url.to_string(), ws_tx);
        client.start();
        tokio::spawn(Self::forward_heads(
            client,
            ws_rx,
            head_tx,
            self.status_tx.clone(),
        ));

        tracing::info!("Subscribed to new heads at {}", ws_url);
        Ok(head_rx)
    }

    fn endpoint(&self) -> &str {
        self.rpc.url()
    }
}

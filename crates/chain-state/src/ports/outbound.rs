//! # Outbound Ports
//!
//! The node client the aggregation core depends on, plus a scriptable
//! mock for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::domain::{Block, BlockId, ChainStateError, NetworkInfo, Receipt};

/// Ethereum node client - outbound port.
///
/// Read-only; one client may be shared by several sessions.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Fetch a block by number or tag. `Ok(None)` when the node does not
    /// know the block (yet).
    async fn get_block(
        &self,
        id: BlockId,
        include_transactions: bool,
    ) -> Result<Option<Block>, ChainStateError>;

    /// Current head number.
    async fn get_block_number(&self) -> Result<u64, ChainStateError>;

    /// Receipt for a transaction hash.
    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Receipt>, ChainStateError>;

    /// Network name and chain id.
    async fn get_network_info(&self) -> Result<NetworkInfo, ChainStateError>;

    /// Raw JSON-RPC call (`eth_syncing`, `net_peerCount`,
    /// `web3_clientVersion`, `admin_nodeInfo`).
    async fn raw_call(&self, method: &str, params: Vec<Value>) -> Result<Value, ChainStateError>;

    /// Stream of new head block numbers.
    ///
    /// The receiver yields until the underlying connection closes and is
    /// not restartable; call again to resubscribe.
    async fn subscribe_new_blocks(&self) -> Result<mpsc::Receiver<u64>, ChainStateError>;

    /// Endpoint identifier for logging.
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<T: NodeClient + ?Sized> NodeClient for Arc<T> {
    async fn get_block(
        &self,
        id: BlockId,
        include_transactions: bool,
    ) -> Result<Option<Block>, ChainStateError> {
        (**self).get_block(id, include_transactions).await
    }

    async fn get_block_number(&self) -> Result<u64, ChainStateError> {
        (**self).get_block_number().await
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Receipt>, ChainStateError> {
        (**self).get_transaction_receipt(tx_hash).await
    }

    async fn get_network_info(&self) -> Result<NetworkInfo, ChainStateError> {
        (**self).get_network_info().await
    }

    async fn raw_call(&self, method: &str, params: Vec<Value>) -> Result<Value, ChainStateError> {
        (**self).raw_call(method, params).await
    }

    async fn subscribe_new_blocks(&self) -> Result<mpsc::Receiver<u64>, ChainStateError> {
        (**self).subscribe_new_blocks().await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Number of failures that never runs out.
pub const ALWAYS_FAIL: u32 = u32::MAX;

#[derive(Default)]
struct MockState {
    blocks: HashMap<u64, Block>,
    block_failures: HashMap<u64, u32>,
    block_delays: HashMap<u64, Duration>,
    block_calls: HashMap<u64, usize>,
    receipts: HashMap<String, Receipt>,
    raw: HashMap<String, Value>,
    raw_script: HashMap<String, VecDeque<(Duration, Result<Value, ChainStateError>)>>,
    chain_id: u64,
    offline: bool,
    subscription: Option<mpsc::Receiver<u64>>,
}

/// Scriptable in-memory node.
///
/// Clones share state, so a test can keep a handle while the session
/// owns another.
#[derive(Clone)]
pub struct MockNode {
    id: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockNode {
    fn default() -> Self {
        let node = Self {
            id: "mock-node".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        };
        node.state.lock().chain_id = 1;
        node
    }
}

impl MockNode {
    /// Empty node on chain id 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Node holding a linked chain of blocks `range`, 12 s apart, with
    /// difficulty 1200 and base fee 1 gwei.
    pub fn with_chain(range: std::ops::RangeInclusive<u64>) -> Self {
        let node = Self::new();
        for number in range {
            node.insert_block(Self::chain_block(number));
        }
        node
    }

    /// Deterministic block used by [`MockNode::with_chain`].
    pub fn chain_block(number: u64) -> Block {
        let mut block = Block::new(
            number,
            format!("0x{:064x}", number),
            format!("0x{:064x}", number.saturating_sub(1)),
            1_700_000_000 + number * 12,
        );
        block.difficulty = Some(1200);
        block.base_fee_per_gas = Some(1_000_000_000);
        block.gas_used = 21_000 * (number % 5);
        block
    }

    /// Add or replace a block.
    pub fn insert_block(&self, block: Block) {
        self.state.lock().blocks.insert(block.number, block);
    }

    /// Make the next `times` fetches of `number` fail with a transport
    /// error ([`ALWAYS_FAIL`] for a permanent failure).
    pub fn fail_block(&self, number: u64, times: u32) {
        self.state.lock().block_failures.insert(number, times);
    }

    /// Delay every fetch of `number`.
    pub fn delay_block(&self, number: u64, delay: Duration) {
        self.state.lock().block_delays.insert(number, delay);
    }

    /// How many times `number` was requested.
    pub fn block_calls(&self, number: u64) -> usize {
        self.state.lock().block_calls.get(&number).copied().unwrap_or(0)
    }

    /// Add a receipt.
    pub fn insert_receipt(&self, receipt: Receipt) {
        self.state
            .lock()
            .receipts
            .insert(receipt.transaction_hash.clone(), receipt);
    }

    /// Standing response for a raw method.
    pub fn set_raw(&self, method: &str, value: Value) {
        self.state.lock().raw.insert(method.to_string(), value);
    }

    /// Queue a one-shot response for a raw method, returned after `delay`.
    /// Queued responses are consumed in order before the standing one.
    pub fn script_raw(&self, method: &str, delay: Duration, response: Result<Value, ChainStateError>) {
        self.state
            .lock()
            .raw_script
            .entry(method.to_string())
            .or_default()
            .push_back((delay, response));
    }

    /// Set the chain id reported by `get_network_info`.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().chain_id = chain_id;
    }

    /// Fail every call with a transport error while `offline`.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Install the receiver handed out by the next `subscribe_new_blocks`.
    pub fn with_subscription(&self, rx: mpsc::Receiver<u64>) {
        self.state.lock().subscription = Some(rx);
    }

    fn check_online(&self) -> Result<(), ChainStateError> {
        if self.state.lock().offline {
            return Err(ChainStateError::Transport("mock node offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn get_block(
        &self,
        id: BlockId,
        _include_transactions: bool,
    ) -> Result<Option<Block>, ChainStateError> {
        self.check_online()?;

        let delay = {
            let state = self.state.lock();
            match id {
                BlockId::Number(n) => state.block_delays.get(&n).copied(),
                _ => None,
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let number = match id {
            BlockId::Number(n) => n,
            BlockId::Earliest => 0,
            _ => match state.blocks.keys().max() {
                Some(max) => *max,
                None => return Ok(None),
            },
        };

        *state.block_calls.entry(number).or_insert(0) += 1;

        if let Some(remaining) = state.block_failures.get_mut(&number) {
            if *remaining > 0 {
                if *remaining != ALWAYS_FAIL {
                    *remaining -= 1;
                }
                return Err(ChainStateError::Transport(format!(
                    "mock failure fetching block {}",
                    number
                )));
            }
        }

        Ok(state.blocks.get(&number).cloned())
    }

    async fn get_block_number(&self) -> Result<u64, ChainStateError> {
        self.check_online()?;
        Ok(self.state.lock().blocks.keys().max().copied().unwrap_or(0))
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Receipt>, ChainStateError> {
        self.check_online()?;
        Ok(self.state.lock().receipts.get(tx_hash).cloned())
    }

    async fn get_network_info(&self) -> Result<NetworkInfo, ChainStateError> {
        self.check_online()?;
        Ok(NetworkInfo::from_chain_id(self.state.lock().chain_id))
    }

    async fn raw_call(&self, method: &str, _params: Vec<Value>) -> Result<Value, ChainStateError> {
        self.check_online()?;

        let scripted = self
            .state
            .lock()
            .raw_script
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        if let Some((delay, response)) = scripted {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return response;
        }

        self.state
            .lock()
            .raw
            .get(method)
            .cloned()
            .ok_or_else(|| ChainStateError::Rpc {
                code: -32601,
                message: format!("the method {} does not exist/is not available", method),
            })
    }

    async fn subscribe_new_blocks(&self) -> Result<mpsc::Receiver<u64>, ChainStateError> {
        self.check_online()?;
        self.state
            .lock()
            .subscription
            .take()
            .ok_or(ChainStateError::SubscriptionClosed)
    }

    fn endpoint(&self) -> &str {
        &self.id
    }
}

//! # Sampler
//!
//! Issues one RPC per polled metric and parses the answer into a typed,
//! generation-stamped sample. Malformed answers become defaults; transport
//! failures are returned so the caller keeps its last-known-good value.

use std::sync::Arc;

use crate::algorithms::{parse_client_version, parse_peer_count, parse_sync_status};
use crate::domain::{ChainStateError, ClientVersion, MetricKind, MetricSample, MetricValue};
use crate::ports::NodeClient;

/// `eth_syncing`
pub const METHOD_SYNCING: &str = "eth_syncing";
/// `net_peerCount`
pub const METHOD_PEER_COUNT: &str = "net_peerCount";
/// `web3_clientVersion`
pub const METHOD_CLIENT_VERSION: &str = "web3_clientVersion";
/// `admin_nodeInfo`
pub const METHOD_NODE_INFO: &str = "admin_nodeInfo";

/// Turns node answers into metric samples.
pub struct Sampler<N: NodeClient + ?Sized> {
    client: Arc<N>,
}

impl<N: NodeClient + ?Sized> Clone for Sampler<N> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<N: NodeClient + ?Sized> Sampler<N> {
    /// Create a sampler over `client`.
    pub fn new(client: Arc<N>) -> Self {
        Self { client }
    }

    /// Sample `kind`, stamping the result with `generation`.
    pub async fn sample(
        &self,
        kind: MetricKind,
        generation: u64,
    ) -> Result<MetricSample, ChainStateError> {
        let value = match kind {
            MetricKind::SyncStatus => {
                let raw = self.client.raw_call(METHOD_SYNCING, vec![]).await?;
                MetricValue::Sync(parse_sync_status(&raw))
            }
            MetricKind::PeerCount => {
                let raw = self.client.raw_call(METHOD_PEER_COUNT, vec![]).await?;
                MetricValue::Peers(parse_peer_count(&raw))
            }
            MetricKind::ClientVersion => {
                let raw = self.client.raw_call(METHOD_CLIENT_VERSION, vec![]).await?;
                let version = match raw.as_str() {
                    Some(s) => parse_client_version(s),
                    None => ClientVersion::unknown(),
                };
                MetricValue::Version(version)
            }
            MetricKind::Network => MetricValue::Network(self.client.get_network_info().await?),
        };

        Ok(MetricSample::new(value, generation))
    }

    /// Node name from `admin_nodeInfo`, when the admin namespace is exposed.
    pub async fn node_name(&self) -> Result<Option<String>, ChainStateError> {
        let raw = self.client.raw_call(METHOD_NODE_INFO, vec![]).await?;
        Ok(raw.get("name").and_then(|v| v.as_str()).map(str::to_string))
    }
}

//! # Dashboard Session
//!
//! All mutable state of one dashboard session: the block ledger, the
//! smoothers, and the last-known-good value of every polled metric.
//!
//! The session is a plain struct with no interior locking. It is owned by
//! exactly one loop ([`super::runner::SessionRunner`]), which applies
//! completed fetches to it one at a time.

use std::time::Instant;

use serde::Serialize;

use crate::algorithms::{gas_price, hashrate, plan_backfill, GapPlan};
use crate::config::ChainStateConfig;
use crate::domain::{
    Block, BlockLedger, ClientVersion, MetricKind, MetricSample, MetricSlot, MetricValue,
    NetworkInfo, Smoother, SyncProgress,
};
use crate::ports::{ChainStateView, DashboardMetrics};

/// Decimals kept when reading the hashrate average.
const HASHRATE_DIGITS: u32 = 2;

/// Decimals kept when reading the peer average.
const PEERS_DIGITS: u32 = 1;

/// Notable state changes, for presenters that keep an event log.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A block entered the ledger.
    BlockAdded {
        /// Block number.
        number: u64,
        /// Whether it arrived through gap backfill.
        backfilled: bool,
    },
    /// A head advance skipped numbers that are now being fetched.
    GapOpened {
        /// Previous head.
        from: u64,
        /// New head.
        to: u64,
        /// Numbers requested.
        requested: usize,
    },
    /// Every number awaited for a gap has landed or run out of retries.
    GapClosed {
        /// Previous head.
        from: u64,
        /// New head.
        to: u64,
        /// Numbers left missing, ascending.
        holes: Vec<u64>,
    },
    /// A backfilled number exhausted its retries.
    BackfillFailed {
        /// Block number left as a hole.
        number: u64,
        /// Last error.
        error: String,
    },
    /// A metric poll failed; the previous value is kept.
    SampleFailed {
        /// Metric polled.
        kind: MetricKind,
        /// Error.
        error: String,
    },
    /// The new-block subscription ended; heads are polled instead.
    SubscriptionClosed,
}

/// Result of ingesting a head block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Whether the block entered the ledger.
    pub inserted: bool,
    /// Whether it became the new head.
    pub new_head: bool,
    /// Intermediate numbers to backfill, excluding ones already held.
    pub gap: GapPlan,
}

/// State of one dashboard session.
#[derive(Debug)]
pub struct DashboardSession {
    ledger: BlockLedger,
    hashrate: Smoother,
    gas_price: Smoother,
    peers_avg: Smoother,
    sync: MetricSlot<Option<SyncProgress>>,
    peers: MetricSlot<Option<u64>>,
    version: MetricSlot<ClientVersion>,
    network: MetricSlot<Option<NetworkInfo>>,
    generation: u64,
}

impl DashboardSession {
    /// Create an empty session.
    pub fn new(config: &ChainStateConfig) -> Self {
        Self {
            ledger: BlockLedger::new(config.ledger_capacity),
            hashrate: Smoother::new(config.hashrate_window),
            gas_price: Smoother::new(config.gas_price_window),
            peers_avg: Smoother::new(config.peers_window),
            sync: MetricSlot::new(None),
            peers: MetricSlot::new(None),
            version: MetricSlot::new(ClientVersion::unknown()),
            network: MetricSlot::new(None),
            generation: 0,
        }
    }

    /// Stamp for the next outgoing sample request.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Latest generation issued.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply a completed sample.
    ///
    /// Returns `false` when a sample issued later has already been applied
    /// to the same metric; the stale value is dropped.
    pub fn apply_sample(&mut self, sample: MetricSample) -> bool {
        let MetricSample {
            value,
            observed_at,
            generation,
        } = sample;

        let applied = match value {
            MetricValue::Sync(progress) => self.sync.apply(Some(progress), generation, observed_at),
            MetricValue::Peers(count) => {
                let applied = self.peers.apply(Some(count), generation, observed_at);
                if applied {
                    self.peers_avg.push(count as f64);
                }
                applied
            }
            MetricValue::Version(version) => self.version.apply(version, generation, observed_at),
            MetricValue::Network(info) => self.network.apply(Some(info), generation, observed_at),
        };

        if !applied {
            tracing::debug!(generation, "Stale sample discarded");
        }
        applied
    }

    /// Seed the ledger from an initial batch. Derived metrics are computed
    /// across consecutive seeded blocks, oldest first, whatever the head
    /// is by the time the batch lands.
    pub fn seed(&mut self, mut blocks: Vec<Block>) {
        blocks.sort_by_key(|b| b.number);
        for (i, block) in blocks.iter().enumerate() {
            self.gas_price.push(gas_price(block) as f64);
            if let Some(parent) = i.checked_sub(1).map(|p| &blocks[p]) {
                if parent.number + 1 == block.number {
                    self.hashrate.push(hashrate(block, parent));
                }
            }
        }
        for block in blocks {
            self.ledger.add_block(block);
        }
    }

    /// Ingest a block announced as (or fetched for) the chain head.
    ///
    /// A block that raises the head updates the gas price and, when its
    /// parent is held, the hashrate. The returned gap lists the numbers
    /// skipped between the previous head and this one.
    pub fn ingest_block(&mut self, block: Block) -> IngestOutcome {
        let previous_head = self.ledger.head_number();
        let number = block.number;
        let raises_head = previous_head.map_or(true, |head| number > head);

        if raises_head {
            self.gas_price.push(gas_price(&block) as f64);
            if let Some(parent) = number.checked_sub(1).and_then(|n| self.ledger.get(n)) {
                self.hashrate.push(hashrate(&block, parent));
            }
        }

        let inserted = self.ledger.add_block(block);

        let mut gap = plan_backfill(previous_head, number, self.ledger.capacity());
        gap.missing.retain(|n| !self.ledger.contains(*n));

        IngestOutcome {
            inserted,
            new_head: inserted && raises_head,
            gap,
        }
    }

    /// Add a block fetched to fill a gap. Metrics are not affected.
    pub fn add_backfilled(&mut self, block: Block) -> bool {
        self.ledger.add_block(block)
    }

    /// Whether `number` is held.
    pub fn holds(&self, number: u64) -> bool {
        self.ledger.contains(number)
    }

    /// Head number, if any block is held.
    pub fn head_number(&self) -> Option<u64> {
        self.ledger.head_number()
    }

    /// The block ledger.
    pub fn ledger(&self) -> &BlockLedger {
        &self.ledger
    }

    /// Owned copy of everything a presenter reads.
    pub fn view(&self) -> SessionView {
        SessionView {
            blocks: self.ledger.snapshot(),
            metrics: self.metrics(),
            generation: self.generation,
            taken_at: Instant::now(),
        }
    }
}

impl ChainStateView for DashboardSession {
    fn snapshot(&self) -> Vec<Block> {
        self.ledger.snapshot()
    }

    fn head(&self) -> Option<&Block> {
        self.ledger.head()
    }

    fn metrics(&self) -> DashboardMetrics {
        DashboardMetrics {
            sync: *self.sync.get(),
            peers: *self.peers.get(),
            peers_avg: self.peers_avg.value(Some(PEERS_DIGITS)),
            version: self.version.get().clone(),
            network: self.network.get().clone(),
            hashrate: self.hashrate.value(Some(HASHRATE_DIGITS)),
            gas_price_wei: self.gas_price.value(Some(0)),
            holes: self.ledger.holes(),
        }
    }
}

/// Snapshot of a session published to presenters.
#[derive(Clone, Debug)]
pub struct SessionView {
    /// Blocks, newest first.
    pub blocks: Vec<Block>,
    /// Metric values.
    pub metrics: DashboardMetrics,
    /// Latest generation issued when the view was taken.
    pub generation: u64,
    /// When the view was taken.
    pub taken_at: Instant,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            metrics: DashboardMetrics::default(),
            generation: 0,
            taken_at: Instant::now(),
        }
    }
}

impl ChainStateView for SessionView {
    fn snapshot(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    fn head(&self) -> Option<&Block> {
        self.blocks.first()
    }

    fn metrics(&self) -> DashboardMetrics {
        self.metrics.clone()
    }
}

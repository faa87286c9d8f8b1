//! # Session Runner
//!
//! The single cooperative loop that owns a [`DashboardSession`].
//!
//! ```text
//!            ┌──────────── tokio::select! ────────────┐
//!  interval ─┤ due metrics → spawn sample tasks       │
//!  newHeads ─┤ head number → spawn head fetch         ├─► DashboardSession ─► watch<SessionView>
//!  JoinSet  ─┤ completed fetch → apply to session     │
//!  shutdown ─┤ stop: abort tasks, drop subscription   │
//!            └────────────────────────────────────────┘
//! ```
//!
//! Every RPC runs as a task in a `JoinSet` owned by the loop, so leaving
//! the loop aborts all of them. When the subscription ends the loop falls
//! back to polling the head number on the sync-status cadence.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use super::backfill::{fetch_with_retry, GapTracker};
use super::sampler::Sampler;
use super::schedule::PollSchedule;
use super::session::{DashboardSession, SessionEvent, SessionView};
use crate::config::{ChainStateConfig, RetryPolicy};
use crate::domain::{Block, ChainStateError, MetricKind, MetricSample};
use crate::ports::NodeClient;

/// Capacity of the event channel. Events are dropped when it is full.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Completed unit of work.
enum TaskOutput {
    Seed(Result<Vec<Block>, ChainStateError>),
    HeadNumber(Result<u64, ChainStateError>),
    Head(u64, Result<Block, ChainStateError>),
    Backfill(u64, Result<Block, ChainStateError>),
    Sample(MetricKind, Result<MetricSample, ChainStateError>),
}

/// Owns one session and drives it from the timer, the subscription and
/// completed fetches.
pub struct SessionRunner<N: NodeClient + ?Sized + 'static> {
    client: Arc<N>,
    sampler: Sampler<N>,
    session: DashboardSession,
    schedule: PollSchedule,
    policy: RetryPolicy,
    seed_blocks: usize,
    full_transactions: bool,
    in_flight: HashSet<u64>,
    gaps: GapTracker,
    view_tx: watch::Sender<SessionView>,
    event_tx: mpsc::Sender<SessionEvent>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<N: NodeClient + ?Sized + 'static> SessionRunner<N> {
    /// Start a session on the current runtime.
    pub fn spawn(client: Arc<N>, config: ChainStateConfig) -> Result<SessionHandle, ChainStateError> {
        config.validate()?;

        let (view_tx, view_rx) = watch::channel(SessionView::default());
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let runner = Self {
            sampler: Sampler::new(Arc::clone(&client)),
            client,
            session: DashboardSession::new(&config),
            schedule: PollSchedule::from_config(&config),
            policy: config.retry_policy(),
            seed_blocks: config.seed_blocks,
            full_transactions: config.full_transactions,
            in_flight: HashSet::new(),
            gaps: GapTracker::new(),
            view_tx,
            event_tx,
            shutdown_rx,
        };

        let join = tokio::spawn(runner.run());

        Ok(SessionHandle {
            view_rx,
            event_rx,
            shutdown_tx,
            join,
        })
    }

    /// Run until shutdown is requested or the handle is dropped, then
    /// return the session state.
    pub async fn run(mut self) -> DashboardSession {
        tracing::info!("Starting dashboard session against {}", self.client.endpoint());

        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut ticker = interval(self.schedule.base_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;

        let mut subscription = match self.client.subscribe_new_blocks().await {
            Ok(rx) => Some(rx),
            Err(e) => {
                tracing::warn!("New-block subscription unavailable, polling heads: {}", e);
                self.emit(SessionEvent::SubscriptionClosed);
                None
            }
        };

        if self.seed_blocks > 0 {
            let client = Arc::clone(&self.client);
            let count = self.seed_blocks;
            let full = self.full_transactions;
            let policy = self.policy;
            tasks.spawn(async move { TaskOutput::Seed(seed(client, count, full, policy).await) });
        }

        loop {
            let mut dirty = false;

            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    tracing::info!("Dashboard session shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    let due = self.schedule.due(tick);
                    tick = tick.wrapping_add(1);

                    for kind in due {
                        let generation = self.session.next_generation();
                        let sampler = self.sampler.clone();
                        tasks.spawn(async move {
                            TaskOutput::Sample(kind, sampler.sample(kind, generation).await)
                        });

                        if kind == MetricKind::SyncStatus && subscription.is_none() {
                            let client = Arc::clone(&self.client);
                            tasks.spawn(async move {
                                TaskOutput::HeadNumber(client.get_block_number().await)
                            });
                        }
                    }
                }

                notification = next_head(&mut subscription) => {
                    match notification {
                        Some(number) => self.on_head_number(number, &mut tasks),
                        None => {
                            tracing::warn!("New-block subscription closed, polling heads");
                            subscription = None;
                            self.emit(SessionEvent::SubscriptionClosed);
                        }
                    }
                }

                Some(joined) = tasks.join_next() => {
                    match joined {
                        Ok(output) => dirty = self.on_task_output(output, &mut tasks),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => tracing::error!("Session task panicked: {}", e),
                    }
                }
            }

            if dirty {
                self.view_tx.send_replace(self.session.view());
            }
        }

        tasks.shutdown().await;
        drop(subscription);
        self.session
    }

    fn on_head_number(&mut self, number: u64, tasks: &mut JoinSet<TaskOutput>) {
        if self.session.holds(number) || !self.in_flight.insert(number) {
            return;
        }
        tracing::debug!(block_number = number, "New head announced");

        let client = Arc::clone(&self.client);
        let full = self.full_transactions;
        let policy = self.policy;
        tasks.spawn(async move {
            TaskOutput::Head(number, fetch_with_retry(&*client, number, full, policy).await)
        });
    }

    /// Fetch the numbers skipped between `from` and `to` and keep the gap
    /// open until each has landed or run out of retries. Numbers already in
    /// flight are awaited, not fetched twice. Returns how many fetches
    /// were started.
    fn reconcile_gap(
        &mut self,
        from: u64,
        to: u64,
        numbers: &[u64],
        tasks: &mut JoinSet<TaskOutput>,
    ) -> usize {
        self.gaps.open(from, to, numbers);

        let mut requested = 0;
        for &number in numbers {
            if !self.in_flight.insert(number) {
                continue;
            }
            requested += 1;
            let client = Arc::clone(&self.client);
            let full = self.full_transactions;
            let policy = self.policy;
            tasks.spawn(async move {
                TaskOutput::Backfill(number, fetch_with_retry(&*client, number, full, policy).await)
            });
        }
        requested
    }

    /// Resolve `number` in every open gap and report the gaps it closed.
    fn settle_gaps(&mut self, number: u64) {
        let held = self.session.holds(number);
        for gap in self.gaps.resolve(number, held) {
            if gap.is_complete() {
                tracing::info!("Gap between #{} and #{} closed", gap.from, gap.to);
            } else {
                tracing::warn!(
                    "Gap between #{} and #{} closed with {} hole(s)",
                    gap.from,
                    gap.to,
                    gap.holes.len()
                );
            }
            self.emit(SessionEvent::GapClosed {
                from: gap.from,
                to: gap.to,
                holes: gap.holes,
            });
        }
    }

    /// Apply a completed task. Returns whether the session changed.
    fn on_task_output(&mut self, output: TaskOutput, tasks: &mut JoinSet<TaskOutput>) -> bool {
        match output {
            TaskOutput::Seed(Ok(blocks)) => {
                tracing::info!("Seeded ledger with {} block(s)", blocks.len());
                self.session.seed(blocks);
                true
            }
            TaskOutput::Seed(Err(e)) => {
                tracing::warn!("Initial block fetch failed: {}", e);
                false
            }

            TaskOutput::HeadNumber(Ok(number)) => {
                self.on_head_number(number, tasks);
                false
            }
            TaskOutput::HeadNumber(Err(e)) => {
                tracing::debug!(error = %e, "Head poll failed");
                false
            }

            TaskOutput::Head(number, result) => {
                self.in_flight.remove(&number);
                match result {
                    Ok(block) => {
                        let previous = self.session.head_number();
                        let outcome = self.session.ingest_block(block);
                        if outcome.inserted {
                            self.emit(SessionEvent::BlockAdded {
                                number,
                                backfilled: false,
                            });
                        }
                        self.settle_gaps(number);
                        if let Some(from) = previous.filter(|_| !outcome.gap.is_empty()) {
                            let requested =
                                self.reconcile_gap(from, number, &outcome.gap.missing, tasks);
                            tracing::info!(
                                "Gap between #{} and #{}: backfilling {} block(s)",
                                from,
                                number,
                                requested
                            );
                            self.emit(SessionEvent::GapOpened {
                                from,
                                to: number,
                                requested,
                            });
                        }
                        outcome.inserted
                    }
                    Err(e) => {
                        tracing::warn!("Head block #{} unavailable: {}", number, e);
                        self.settle_gaps(number);
                        false
                    }
                }
            }

            TaskOutput::Backfill(number, result) => {
                self.in_flight.remove(&number);
                match result {
                    Ok(block) => {
                        let added = self.session.add_backfilled(block);
                        if added {
                            self.emit(SessionEvent::BlockAdded {
                                number,
                                backfilled: true,
                            });
                        }
                        self.settle_gaps(number);
                        added
                    }
                    Err(e) => {
                        tracing::warn!("Backfill hole at block {}: {}", number, e);
                        self.emit(SessionEvent::BackfillFailed {
                            number,
                            error: e.to_string(),
                        });
                        self.settle_gaps(number);
                        true
                    }
                }
            }

            TaskOutput::Sample(_, Ok(sample)) => self.session.apply_sample(sample),
            TaskOutput::Sample(kind, Err(e)) => {
                tracing::debug!(metric = %kind, error = %e, "Sample failed, keeping last value");
                self.emit(SessionEvent::SampleFailed {
                    kind,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.event_tx.try_send(event).is_err() {
            tracing::trace!("Event channel full or closed, event dropped");
        }
    }
}

/// Next head number from the subscription; pending forever without one.
async fn next_head(subscription: &mut Option<mpsc::Receiver<u64>>) -> Option<u64> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Fetch the `count` most recent blocks.
async fn seed<N: NodeClient + ?Sized>(
    client: Arc<N>,
    count: usize,
    full_transactions: bool,
    policy: RetryPolicy,
) -> Result<Vec<Block>, ChainStateError> {
    let head = client.get_block_number().await?;
    let from = head.saturating_sub(count.saturating_sub(1) as u64);

    let results = join_all(
        (from..=head).map(|n| fetch_with_retry(&*client, n, full_transactions, policy)),
    )
    .await;

    let mut blocks = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(block) => blocks.push(block),
            Err(e) => tracing::warn!("Seed fetch failed: {}", e),
        }
    }
    Ok(blocks)
}

/// Handle to a running session.
pub struct SessionHandle {
    view_rx: watch::Receiver<SessionView>,
    event_rx: mpsc::Receiver<SessionEvent>,
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<DashboardSession>,
}

impl SessionHandle {
    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified on every published view.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    /// Wait for the next event. `None` once the session has ended.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// Next event if one is queued.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Stop the loop, abort in-flight fetches, and return the final state.
    pub async fn stop(self) -> Result<DashboardSession, ChainStateError> {
        // The loop may already have exited; the join below still resolves.
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| ChainStateError::SessionTask(e.to_string()))
    }
}

//! Application state management.

use chain_state::{
    capitalize, format_gwei, format_hashrate, ChainStateView, SessionEvent,
    SessionView, SyncProgress,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::ws::WsEvent;

/// Maximum number of events to keep in history.
const MAX_EVENTS: usize = 100;

/// A line in the event log.
#[derive(Debug, Clone)]
pub struct LiveEvent {
    /// Timestamp when event was received.
    pub timestamp: Instant,
    /// Event type string.
    pub event_type: String,
    /// Event description.
    pub description: String,
}

/// Application state holding all dashboard data.
pub struct App {
    /// Node endpoint shown in the header.
    pub endpoint: String,

    /// Node name from `admin_nodeInfo`, when exposed.
    pub node_name: Option<String>,

    /// Latest session view.
    pub view: SessionView,

    /// WebSocket connection status.
    pub ws_connected: bool,

    /// Whether the app should quit.
    pub should_quit: bool,

    /// Selected row in the blocks table.
    pub blocks_selected: usize,

    /// Application start time.
    pub start_time: Instant,

    /// Live events log, newest first.
    pub live_events: VecDeque<LiveEvent>,
}

impl App {
    /// Create a new application instance.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            node_name: None,
            view: SessionView::default(),
            ws_connected: false,
            should_quit: false,
            blocks_selected: 0,
            start_time: Instant::now(),
            live_events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    /// Replace the displayed view.
    pub fn apply_view(&mut self, view: SessionView) {
        self.view = view;
        let rows = self.view.blocks.len();
        if self.blocks_selected >= rows {
            self.blocks_selected = rows.saturating_sub(1);
        }
    }

    /// Record a session event in the log.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::BlockAdded { number, backfilled } => {
                let kind = if backfilled { "backfill" } else { "newHeads" };
                let txs = self
                    .view
                    .blocks
                    .iter()
                    .find(|b| b.number == number)
                    .map(|b| format!(" ({} txs)", b.tx_count()))
                    .unwrap_or_default();
                self.add_event(kind, &format!("Block #{}{}", number, txs));
            }
            SessionEvent::GapOpened {
                from,
                to,
                requested,
            } => {
                self.add_event(
                    "gap",
                    &format!("#{} -> #{}, fetching {} block(s)", from, to, requested),
                );
            }
            SessionEvent::GapClosed { from, to, holes } => {
                if holes.is_empty() {
                    self.add_event("gap", &format!("#{} -> #{} filled", from, to));
                } else {
                    self.add_event(
                        "gap",
                        &format!("#{} -> #{} closed, {} missing", from, to, holes.len()),
                    );
                }
            }
            SessionEvent::BackfillFailed { number, error } => {
                self.add_event("error", &format!("Block #{} missing: {}", number, error));
            }
            SessionEvent::SampleFailed { kind, error } => {
                self.add_event("error", &format!("{}: {}", kind.name(), error));
            }
            SessionEvent::SubscriptionClosed => {
                self.add_event("ws", "Subscription closed, polling for heads");
            }
        }
    }

    /// Handle a WebSocket status event.
    pub fn handle_ws_event(&mut self, event: WsEvent) {
        match event {
            WsEvent::Connected => {
                self.ws_connected = true;
                self.add_event("ws", "WebSocket connected");
            }
            WsEvent::Disconnected => {
                self.ws_connected = false;
                self.add_event("ws", "WebSocket disconnected");
            }
            WsEvent::Error(msg) => {
                self.add_event("error", &msg);
            }
            // Heads reach the app through the session view.
            WsEvent::NewHead(_) => {}
        }
    }

    /// Add an event to the live events log.
    fn add_event(&mut self, event_type: &str, description: &str) {
        self.live_events.push_front(LiveEvent {
            timestamp: Instant::now(),
            event_type: event_type.to_string(),
            description: description.to_string(),
        });

        if self.live_events.len() > MAX_EVENTS {
            self.live_events.pop_back();
        }
    }

    /// Get uptime duration.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Format uptime as human-readable string.
    pub fn uptime_str(&self) -> String {
        format_uptime(self.uptime())
    }

    /// Get node status string.
    pub fn status_str(&self) -> &'static str {
        match self.view.metrics.sync {
            _ if self.view.head().is_none() => "CONNECTING",
            Some(SyncProgress::Syncing { .. }) => "SYNCING",
            _ => "RUNNING",
        }
    }

    /// Node name if known, otherwise the endpoint.
    pub fn node_label(&self) -> &str {
        self.node_name.as_deref().unwrap_or(&self.endpoint)
    }

    /// Platform with the first letter capitalised.
    pub fn platform_display(&self) -> String {
        capitalize(&self.view.metrics.version.platform)
    }

    /// Network name, or `Unknown` before the first sample.
    pub fn network_display(&self) -> String {
        match &self.view.metrics.network {
            Some(info) => format!("{} ({})", capitalize(&info.name), info.chain_id),
            None => chain_state::UNKNOWN.to_string(),
        }
    }

    /// One-line summary for headless mode.
    pub fn status_line(&self) -> String {
        let metrics = &self.view.metrics;
        let head = self
            .view
            .head()
            .map(|b| format!("#{}", b.number))
            .unwrap_or_else(|| "-".to_string());
        let peers = metrics
            .peers
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} head={} sync={:.2}% peers={} (avg {:.1}) hashrate={} gas={} version={} platform={} holes={}",
            self.status_str(),
            head,
            metrics.sync_percent(),
            peers,
            metrics.peers_avg,
            format_hashrate(metrics.hashrate),
            format_gwei(metrics.gas_price_wei),
            metrics.version.version,
            self.platform_display(),
            metrics.holes.len(),
        )
    }

    /// Handle key press events.
    pub fn on_key(&mut self, key: crossterm::event::KeyCode) {
        use crossterm::event::KeyCode;

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.blocks_selected = self.blocks_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.blocks_selected + 1 < self.view.blocks.len() {
                    self.blocks_selected += 1;
                }
            }
            KeyCode::Home => {
                self.blocks_selected = 0;
            }
            _ => {}
        }
    }
}

/// Format a duration as `Xd Yh Zm`, dropping leading zero units.
pub fn format_uptime(duration: Duration) -> String {
    let secs = duration.as_secs();

    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_state::{ClientVersion, DashboardMetrics, MockNode, NetworkInfo};
    use crossterm::event::KeyCode;

    fn view_with(numbers: &[u64], metrics: DashboardMetrics) -> SessionView {
        SessionView {
            blocks: numbers.iter().map(|&n| MockNode::chain_block(n)).collect(),
            metrics,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_follows_sync() {
        let mut app = App::new("http://localhost:8545".to_string());
        assert_eq!(app.status_str(), "CONNECTING");

        app.apply_view(view_with(
            &[10],
            DashboardMetrics {
                sync: Some(SyncProgress::Syncing {
                    current: 5,
                    highest: 10,
                }),
                ..Default::default()
            },
        ));
        assert_eq!(app.status_str(), "SYNCING");

        app.apply_view(view_with(
            &[10],
            DashboardMetrics {
                sync: Some(SyncProgress::Synced),
                ..Default::default()
            },
        ));
        assert_eq!(app.status_str(), "RUNNING");
    }

    #[test]
    fn test_event_log_is_bounded() {
        let mut app = App::new(String::new());
        for n in 0..(MAX_EVENTS as u64 + 20) {
            app.handle_session_event(SessionEvent::BlockAdded {
                number: n,
                backfilled: false,
            });
        }
        assert_eq!(app.live_events.len(), MAX_EVENTS);
        assert_eq!(app.live_events[0].description, "Block #119");
    }

    #[test]
    fn test_gap_events_logged() {
        let mut app = App::new(String::new());
        app.handle_session_event(SessionEvent::GapClosed {
            from: 100,
            to: 105,
            holes: vec![],
        });
        app.handle_session_event(SessionEvent::GapClosed {
            from: 200,
            to: 205,
            holes: vec![202, 203],
        });

        assert_eq!(app.live_events[0].description, "#200 -> #205 closed, 2 missing");
        assert_eq!(app.live_events[1].description, "#100 -> #105 filled");
        assert_eq!(app.live_events[1].event_type, "gap");
    }

    #[test]
    fn test_ws_status_tracked() {
        let mut app = App::new(String::new());
        app.handle_ws_event(WsEvent::Connected);
        assert!(app.ws_connected);
        app.handle_ws_event(WsEvent::Disconnected);
        assert!(!app.ws_connected);
        assert_eq!(app.live_events.len(), 2);
    }

    #[test]
    fn test_selection_clamped_to_view() {
        let mut app = App::new(String::new());
        app.apply_view(view_with(&[3, 2, 1], DashboardMetrics::default()));
        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Down);
        assert_eq!(app.blocks_selected, 2);

        app.apply_view(view_with(&[3], DashboardMetrics::default()));
        assert_eq!(app.blocks_selected, 0);
    }

    #[test]
    fn test_status_line() {
        let mut app = App::new(String::new());
        app.apply_view(view_with(
            &[42],
            DashboardMetrics {
                sync: Some(SyncProgress::Synced),
                peers: Some(7),
                peers_avg: 6.5,
                version: ClientVersion {
                    version: "Geth/v1.13.5".to_string(),
                    platform: "linux-amd64".to_string(),
                },
                network: Some(NetworkInfo::from_chain_id(1)),
                hashrate: 2048.0,
                gas_price_wei: 20_000_000_000.0,
                holes: vec![],
            },
        ));

        let line = app.status_line();
        assert!(line.starts_with("RUNNING head=#42 sync=100.00% peers=7 (avg 6.5)"));
        assert!(line.contains("hashrate=2.00 KH"));
        assert!(line.contains("gas=20.00 gwei"));
        assert!(line.contains("platform=Linux-amd64"));
        assert_eq!(app.network_display(), "Mainnet (1)");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0m");
        assert_eq!(format_uptime(Duration::from_secs(3_700)), "1h 1m");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m");
    }
}

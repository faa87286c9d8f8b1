//! ETH-DASH: live terminal dashboard for an Ethereum node.
//!
//! Follows new heads over the node's WebSocket endpoint, backfills any
//! numbers the subscription skipped, and polls sync status, peers, client
//! version and network on their own cadences. All of that is aggregated by
//! a `chain_state` session; this binary only draws it.
//!
//! ## Usage
//!
//! ```bash
//! # Connect to localhost (default)
//! eth-dash
//!
//! # Remote node, no terminal UI, block API on :3000
//! eth-dash --rpc-url http://node:8545 --ws-url ws://node:8546 \
//!     --headless --api-addr 0.0.0.0:3000
//! ```

mod api;
mod app;
mod node;
mod rpc;
mod ui;
mod ws;

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chain_state::{ChainStateConfig, NodeClient, Sampler, SessionHandle, SessionRunner};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dash_telemetry::TelemetryConfig;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use app::App;
use node::EthNode;
use ws::WsEvent;

/// Log file used in TUI mode when none is configured.
const DEFAULT_TUI_LOG_FILE: &str = "eth-dash.log";

/// Live Ethereum node dashboard
#[derive(Parser, Debug)]
#[command(name = "eth-dash")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-RPC endpoint URL
    #[arg(long, env = "ETH_DASH_RPC_URL", default_value = "http://localhost:8545")]
    rpc_url: String,

    /// WebSocket endpoint URL; leave empty to poll heads over HTTP
    #[arg(long, env = "ETH_DASH_WS_URL", default_value = "ws://localhost:8546")]
    ws_url: String,

    /// Number of recent blocks kept
    #[arg(long, env = "ETH_DASH_LEDGER_CAPACITY")]
    ledger_capacity: Option<usize>,

    /// Session base tick in milliseconds
    #[arg(long, env = "ETH_DASH_TICK_MS")]
    tick_ms: Option<u64>,

    /// Screen / status-line refresh interval in milliseconds
    #[arg(long, env = "ETH_DASH_REFRESH_MS", default_value = "1000")]
    refresh_ms: u64,

    /// Serve the block API on this address
    #[arg(long, env = "ETH_DASH_API_ADDR")]
    api_addr: Option<SocketAddr>,

    /// Log a status line instead of drawing the terminal UI
    #[arg(long, env = "ETH_DASH_HEADLESS")]
    headless: bool,

    /// Write logs to this file
    #[arg(long, env = "ETH_DASH_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Session configuration with command-line overrides applied.
    fn session_config(&self) -> ChainStateConfig {
        let mut config = ChainStateConfig::default();
        if let Some(capacity) = self.ledger_capacity {
            config.ledger_capacity = capacity;
            config.seed_blocks = config.seed_blocks.min(capacity);
        }
        if let Some(tick_ms) = self.tick_ms {
            config.base_tick_ms = tick_ms;
        }
        config
    }

    /// Logging configuration. The terminal UI owns stdout and stderr, so
    /// TUI mode always logs to a file.
    fn telemetry_config(&self) -> TelemetryConfig {
        let config = TelemetryConfig::from_env();
        match (&self.log_file, &config.log_file) {
            (Some(path), _) => config.with_log_file(path),
            (None, None) if !self.headless => config.with_log_file(DEFAULT_TUI_LOG_FILE),
            _ => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _logging = dash_telemetry::init_logging(&args.telemetry_config())?;

    let (status_tx, status_rx) = mpsc::channel(100);
    let node = Arc::new(
        EthNode::new(args.rpc_url.clone(), args.ws_url.clone()).with_status(status_tx),
    );

    let mut handle = SessionRunner::spawn(Arc::clone(&node), args.session_config())?;

    if let Some(addr) = args.api_addr {
        serve_api(addr, node.clone()).await?;
    }

    let mut app = App::new(args.rpc_url.clone());
    match Sampler::new(Arc::clone(&node)).node_name().await {
        Ok(Some(name)) => {
            tracing::info!("Connected to {}", name);
            app.node_name = Some(name);
        }
        Ok(None) => {}
        Err(e) => tracing::debug!("admin_nodeInfo unavailable: {}", e),
    }
    let refresh_interval = Duration::from_millis(args.refresh_ms.max(1));

    let result = if args.headless {
        run_headless(&mut app, &mut handle, refresh_interval, status_rx).await
    } else {
        run_tui(&mut app, &mut handle, refresh_interval, status_rx).await
    };

    let session = handle.stop().await?;
    tracing::info!(
        "Session stopped at head {:?} with {} block(s) held",
        session.head_number(),
        session.ledger().len()
    );

    result
}

/// Bind the block API and serve it in the background.
async fn serve_api(addr: SocketAddr, node: Arc<dyn NodeClient>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API address {}", addr))?;
    tracing::info!("Block API listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, api::router(node)).await {
            tracing::error!("Block API stopped: {}", e);
        }
    });
    Ok(())
}

/// Pull everything the session and the socket produced since the last
/// refresh into the app.
fn sync_app(app: &mut App, handle: &mut SessionHandle, status_rx: &mut mpsc::Receiver<WsEvent>) {
    app.apply_view(handle.view());

    while let Some(event) = handle.try_next_event() {
        app.handle_session_event(event);
    }

    while let Ok(event) = status_rx.try_recv() {
        app.handle_ws_event(event);
    }
}

/// Log a status line on every refresh until Ctrl-C.
async fn run_headless(
    app: &mut App,
    handle: &mut SessionHandle,
    refresh_interval: Duration,
    mut status_rx: mpsc::Receiver<WsEvent>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(refresh_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, shutting down");
                return Ok(());
            }
            _ = ticker.tick() => {
                sync_app(app, handle, &mut status_rx);
                tracing::info!("{}", app.status_line());
            }
        }
    }
}

/// Draw the terminal UI until the user quits.
async fn run_tui(
    app: &mut App,
    handle: &mut SessionHandle,
    refresh_interval: Duration,
    status_rx: mpsc::Receiver<WsEvent>,
) -> Result<()> {
    // Setup terminal with panic hook for cleanup
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app, handle, refresh_interval, status_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    handle: &mut SessionHandle,
    refresh_interval: Duration,
    mut status_rx: mpsc::Receiver<WsEvent>,
) -> Result<()> {
    let poll_timeout = refresh_interval.min(Duration::from_millis(100));

    loop {
        sync_app(app, handle, &mut status_rx);
        terminal.draw(|frame| ui::render(frame, app))?;

        handle_terminal_events(app, poll_timeout)?;

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Handle terminal key events.
fn handle_terminal_events(app: &mut App, poll_timeout: Duration) -> Result<()> {
    if !event::poll(poll_timeout)? {
        return Ok(());
    }

    let Event::Key(key) = event::read()? else {
        return Ok(());
    };

    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    app.on_key(key.code);
    Ok(())
}

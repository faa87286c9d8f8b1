//! Dashboard UI rendering.

use crate::app::App;
use crate::ui::{blocks, format_number};
use chain_state::{format_gwei, format_hashrate, ChainStateView};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Render the main dashboard.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(7),  // Chain + Node panels
            Constraint::Min(8),     // Recent blocks
            Constraint::Length(10), // Live events
            Constraint::Length(3),  // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_info_panels(frame, app, chunks[1]);
    blocks::render_blocks_table(frame, app, chunks[2]);
    render_live_events(frame, app, chunks[3]);
    render_footer(frame, chunks[4]);
}

/// Render the header bar.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let metrics = &app.view.metrics;
    let status_color = match app.status_str() {
        "RUNNING" => Color::Green,
        "SYNCING" => Color::Yellow,
        _ => Color::Red,
    };

    let header = Paragraph::new(Line::from(vec![
        Span::raw(" Status: "),
        Span::styled(
            format!("● {}", app.status_str()),
            Style::default().fg(status_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("    Uptime: "),
        Span::styled(app.uptime_str(), Style::default().fg(Color::Cyan)),
        Span::raw("    Sync: "),
        Span::styled(
            format!("{}%", metrics.sync_percent()),
            Style::default().fg(if metrics.is_synced() {
                Color::Green
            } else {
                Color::Yellow
            }),
        ),
        Span::raw("    Node: "),
        Span::styled(app.node_label().to_string(), Style::default().fg(Color::DarkGray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" ETH-DASH v{} ", env!("CARGO_PKG_VERSION"))),
    );

    frame.render_widget(header, area);
}

/// Render the chain and node panels side by side.
fn render_info_panels(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_chain_info(frame, app, chunks[0]);
    render_node_info(frame, app, chunks[1]);
}

/// Render chain information panel.
fn render_chain_info(frame: &mut Frame, app: &App, area: Rect) {
    let metrics = &app.view.metrics;
    let head = app
        .view
        .head()
        .map(|b| format!("#{}", format_number(b.number)))
        .unwrap_or_else(|| "-".to_string());

    let text = vec![
        Line::from(vec![
            Span::raw(" Latest:     "),
            Span::styled(
                head,
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(" Network:    "),
            Span::styled(app.network_display(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw(" Gas Price:  "),
            Span::styled(
                format_gwei(metrics.gas_price_wei),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(vec![
            Span::raw(" Hashrate:   "),
            Span::styled(
                format_hashrate(metrics.hashrate),
                Style::default().fg(Color::Magenta),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" ⛓ CHAIN ")
        .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

/// Render node information panel.
fn render_node_info(frame: &mut Frame, app: &App, area: Rect) {
    let metrics = &app.view.metrics;

    let ws_symbol = if app.ws_connected { "●" } else { "○" };
    let ws_color = if app.ws_connected { Color::Green } else { Color::Red };
    let ws_text = if app.ws_connected { "Streaming" } else { "Polling" };

    let peer_count = metrics.peers.unwrap_or(0);
    let peer_color = if peer_count > 0 { Color::Green } else { Color::Yellow };

    let text = vec![
        Line::from(vec![
            Span::raw(" Peers:      "),
            Span::styled(
                metrics
                    .peers
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(peer_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" (avg {:.1})", metrics.peers_avg),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::raw(" Version:    "),
            Span::styled(
                metrics.version.version.clone(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::raw(" Platform:   "),
            Span::styled(app.platform_display(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw(" WebSocket:  "),
            Span::styled(ws_symbol, Style::default().fg(ws_color)),
            Span::styled(format!(" {}", ws_text), Style::default().fg(ws_color)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" 🌐 NODE ")
        .border_style(Style::default().fg(Color::Magenta));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

/// Render live events panel.
fn render_live_events(frame: &mut Frame, app: &App, area: Rect) {
    let max_events = (area.height as usize).saturating_sub(2);

    let items: Vec<ListItem> = app
        .live_events
        .iter()
        .take(max_events)
        .map(|event| {
            let time_str = crate::ui::format_ago(event.timestamp.elapsed().as_secs());

            let type_color = match event.event_type.as_str() {
                "newHeads" => Color::Green,
                "backfill" => Color::Cyan,
                "gap" => Color::Yellow,
                "ws" => Color::Blue,
                "error" => Color::Red,
                _ => Color::Gray,
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<8}", time_str), Style::default().fg(Color::DarkGray)),
                Span::raw(" │ "),
                Span::styled(format!("{:<10}", event.event_type), Style::default().fg(type_color)),
                Span::raw(" │ "),
                Span::raw(event.description.as_str()),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" LIVE EVENTS ")
        .border_style(Style::default().fg(Color::Green));

    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Span::styled(
            " Waiting for events...",
            Style::default().fg(Color::DarkGray),
        ))])
    } else {
        List::new(items)
    };

    frame.render_widget(list.block(block), area);
}

/// Render the footer bar.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" [↑/↓] ", Style::default().fg(Color::Yellow)),
        Span::raw("Select block  "),
        Span::styled("[Home] ", Style::default().fg(Color::Yellow)),
        Span::raw("Head  "),
        Span::styled("[Q] ", Style::default().fg(Color::Yellow)),
        Span::raw("Quit"),
    ]))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

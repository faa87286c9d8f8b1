//! Recent blocks table.

use crate::app::App;
use crate::ui::{format_ago, format_number};
use chain_state::{extra_data_ascii, ChainStateView};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Row, Table, TableState},
    Frame,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Render the blocks table from the ledger snapshot.
pub fn render_blocks_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![" Height", "Hash", "Txs", "Gas Used", "Age", "Extra Data"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .height(1);

    let now = unix_now();
    let head = app.view.head().map(|b| b.number).unwrap_or(0);

    let rows: Vec<Row> = app
        .view
        .blocks
        .iter()
        .map(|block| {
            let style = if block.number == head {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };

            Row::new(vec![
                format!(" #{}", format_number(block.number)),
                block.short_hash(),
                format!("{:>4}", block.tx_count()),
                format_gas(block.gas_used),
                format_ago(now.saturating_sub(block.timestamp)),
                extra_data_ascii(&block.extra_data),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Min(12),
    ];

    let title = match app.view.metrics.holes.len() {
        0 => format!(" RECENT BLOCKS ({}) ", app.view.blocks.len()),
        n => format!(" RECENT BLOCKS ({}, {} missing) ", app.view.blocks.len(), n),
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = TableState::default().with_selected(Some(app.blocks_selected));
    frame.render_stateful_widget(table, area, &mut state);
}

/// Format gas used.
fn format_gas(gas: u64) -> String {
    if gas >= 1_000_000 {
        format!("{:.1}M", gas as f64 / 1_000_000.0)
    } else if gas >= 1_000 {
        format!("{:.1}K", gas as f64 / 1_000.0)
    } else {
        format!("{}", gas)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gas() {
        assert_eq!(format_gas(21_000), "21.0K");
        assert_eq!(format_gas(12_500_000), "12.5M");
        assert_eq!(format_gas(999), "999");
    }
}

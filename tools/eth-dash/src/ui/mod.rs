//! UI module for TUI rendering.

pub mod blocks;
pub mod dashboard;

use crate::app::App;
use ratatui::Frame;

/// Render the dashboard.
pub fn render(frame: &mut Frame, app: &App) {
    dashboard::render(frame, app);
}

/// Format a number with thousand separators.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Format elapsed seconds as `Ns ago`, `Nm ago` or `Nh ago`.
pub fn format_ago(secs: u64) -> String {
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

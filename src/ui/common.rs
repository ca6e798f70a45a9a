//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};

/// Render the header bar.
///
/// Displays: connection indicator, graph and watcher counts, event totals.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let dashboard = &app.dashboard;
    let registry = dashboard.registry();
    let connected = dashboard.is_connected();

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.connection_style(connected)),
        Span::styled("STATWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::raw(if connected { "connected" } else { "disconnected" }),
        Span::raw(" │ "),
        Span::styled(
            format!("{}", registry.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" graphs "),
        Span::raw(format!(
            "({} watchers, {} dynamic)",
            registry.watchers().len(),
            registry.dynamic_watchers().len()
        )),
        Span::raw(" │ "),
        Span::raw(format!("events {}", format_count(dashboard.events_handled()))),
        if dashboard.events_unrouted() > 0 {
            Span::styled(
                format!(" unrouted {}", format_count(dashboard.events_unrouted())),
                Style::default().add_modifier(Modifier::DIM),
            )
        } else {
            Span::raw("")
        },
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Render the tab bar showing available views.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Graphs "), Line::from(" 2:Readouts ")];

    let selected = match app.current_view {
        View::Graphs => 0,
        View::Readouts => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows the transport, time since the last event and available controls.
/// Temporary status messages and transport errors take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.filter_active {
        "Type to search | Enter:apply Esc:cancel"
    } else {
        "/:search Tab:switch e:export ?:help q:quit"
    };

    let status = match (app.since_update(), app.transport_error()) {
        (_, Some(err)) if !app.dashboard.is_connected() => {
            format!(" {} | {} | q:quit", app.source_description(), err)
        }
        (Some(elapsed), _) => format!(
            " {} | Updated {:.1}s ago | {}",
            app.source_description(),
            elapsed.as_secs_f64(),
            controls,
        ),
        (None, _) => format!(" {} | Waiting... | {}", app.source_description(), controls),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  Tab 1/2     Switch views"),
        Line::from("  ↑/↓ j/k     Select graph"),
        Line::from("  PgUp/PgDn   Jump 10 graphs"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Filter",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  /         Filter by graph or entity"),
        Line::from("  c / Esc   Clear filter"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  e         Export readouts to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 22u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }
}

//! Graph grid rendering.
//!
//! Draws one line chart per visible graph, laid out in a grid whose cell
//! size follows the configured graph width and height. When the grid cannot
//! hold every graph, the page containing the selected graph is shown.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::config::GraphConfig;
use crate::data::CAP;
use crate::graph::{GraphBinding, SeriesStyle};

/// Approximate pixel size of one terminal column and row.
const PX_PER_COL: u16 = 6;
const PX_PER_ROW: u16 = 8;

const MIN_CELL_WIDTH: u16 = 24;
const MIN_CELL_HEIGHT: u16 = 7;

/// Terminal cell size of one chart, borders included.
pub fn cell_size(config: &GraphConfig) -> (u16, u16) {
    let width = (config.width / PX_PER_COL).max(MIN_CELL_WIDTH);
    let height = (config.height / PX_PER_ROW + 2).max(MIN_CELL_HEIGHT);
    (width, height)
}

/// Columns and rows of charts that fit in `area`; at least one of each.
pub fn grid_size(area: Rect, config: &GraphConfig) -> (usize, usize) {
    let (width, height) = cell_size(config);
    let cols = (area.width / width).max(1) as usize;
    let rows = (area.height / height).max(1) as usize;
    (cols, rows)
}

/// Upper bound of the value axis.
///
/// Capped graphs always span 0 to 100; others scale to the largest value in
/// the window with some headroom.
pub fn value_ceiling(binding: &GraphBinding) -> f64 {
    if binding.caps_values() {
        return CAP;
    }
    binding
        .buffer()
        .max_value()
        .map(|max| (max * 1.1).max(1.0))
        .unwrap_or(1.0)
}

/// Render the grid of charts for the visible graphs.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let graphs = app.visible_graphs();
    if graphs.is_empty() {
        render_waiting(frame, app, area);
        return;
    }

    let config = app.dashboard.registry().graph_config();
    let (mut cols, mut rows) = grid_size(area, config);
    let mut grid_area = area;

    if graphs.len() > cols * rows {
        let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);
        grid_area = chunks[0];
        (cols, rows) = grid_size(grid_area, config);

        let per_page = cols * rows;
        let page = app.selected_index.min(graphs.len() - 1) / per_page;
        let footer = Paragraph::new(format!(
            " page {}/{} ",
            page + 1,
            graphs.len().div_ceil(per_page)
        ))
        .alignment(Alignment::Right)
        .style(Style::default().fg(app.theme.muted));
        frame.render_widget(footer, chunks[1]);
    }

    let per_page = cols * rows;
    let selected = app.selected_index.min(graphs.len() - 1);
    let first = (selected / per_page) * per_page;

    let row_areas = Layout::vertical(vec![Constraint::Ratio(1, rows as u32); rows]).split(grid_area);
    for (slot, binding) in graphs.iter().enumerate().skip(first).take(per_page) {
        let local = slot - first;
        let cells = Layout::horizontal(vec![Constraint::Ratio(1, cols as u32); cols])
            .split(row_areas[local / cols]);
        render_chart(frame, app, binding, cells[local % cols], slot == selected);
    }
}

fn render_waiting(frame: &mut Frame, app: &App, area: Rect) {
    let message = if app.dashboard.registry().is_empty() && app.filter_text.is_empty() {
        "Waiting for graphs..."
    } else {
        "No graphs match the filter"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    let paragraph = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::DIM))
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_chart(frame: &mut Frame, app: &App, binding: &GraphBinding, area: Rect, selected: bool) {
    let buffer = binding.buffer();
    let lines: Vec<(&SeriesStyle, Vec<(f64, f64)>)> = binding
        .series()
        .iter()
        .map(|style| (style, buffer.series(style.metric)))
        .collect();

    let datasets: Vec<Dataset> = lines
        .iter()
        .map(|(style, points)| {
            Dataset::default()
                .name(style.metric.name())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(app.theme.series_color(style)))
                .data(points)
        })
        .collect();

    let border_style = if selected {
        Style::default().fg(app.theme.highlight)
    } else {
        Style::default().fg(app.theme.border)
    };
    let block = Block::default()
        .title(chart_title(app, binding))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(border_style);

    let ceiling = value_ceiling(binding);
    let axis_style = Style::default().fg(app.theme.muted);
    let chart = Chart::new(datasets)
        .block(block)
        .legend_position(None)
        .x_axis(Axis::default().bounds(buffer.x_bounds()).style(axis_style))
        .y_axis(
            Axis::default()
                .bounds([0.0, ceiling])
                .labels(vec!["0".to_string(), format!("{:.0}", ceiling)])
                .style(axis_style),
        );

    frame.render_widget(chart, area);
}

/// Graph id followed by the readout of each metric and the sample age.
fn chart_title<'a>(app: &App, binding: &'a GraphBinding) -> Line<'a> {
    let mut spans = vec![Span::styled(
        format!(" {} ", binding.graph_id()),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    for style in binding.series() {
        let readout = app.screen.readout(binding.graph_id(), style.metric).unwrap_or("-");
        spans.push(Span::styled(
            format!("{} {} ", style.metric, readout),
            Style::default().fg(app.theme.series_color(style)),
        ));
    }

    if let Some(age) = app.screen.age(binding.graph_id()) {
        spans.push(Span::styled(format!("{} ", age), Style::default().fg(app.theme.muted)));
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    use crate::bus::EventBus;
    use crate::dashboard::Dashboard;
    use crate::graph::{BindingSpec, GraphFactory, RecordingView};
    use crate::registry::WatcherEntry;
    use crate::source::ChannelTransport;
    use crate::ui::Theme;

    #[test]
    fn test_cell_size_follows_config() {
        assert_eq!(cell_size(&GraphConfig::default()), (48, 11));

        let tiny = GraphConfig {
            width: 10,
            height: 10,
            ..GraphConfig::default()
        };
        assert_eq!(cell_size(&tiny), (MIN_CELL_WIDTH, MIN_CELL_HEIGHT));
    }

    #[test]
    fn test_grid_size_never_zero() {
        let config = GraphConfig::default();
        assert_eq!(grid_size(Rect::new(0, 0, 100, 24), &config), (2, 2));
        assert_eq!(grid_size(Rect::new(0, 0, 10, 3), &config), (1, 1));
    }

    #[test]
    fn test_value_ceiling() {
        let mut bus = EventBus::new();
        let factory = GraphFactory::new(Arc::new(GraphConfig::default()));
        let mut view = RecordingView::default();

        let mut process = factory.create(&mut bus, BindingSpec::process("web", "web-st"));
        process.apply(&json!({"cpu": 3.0, "mem": 4.0}), &mut view);
        assert_eq!(value_ceiling(&process), 100.0);

        let mut socket = factory.create(&mut bus, BindingSpec::socket("socket-stats", "socket-stats-st"));
        assert_eq!(value_ceiling(&socket), 1.0);
        socket.apply(&json!({"reads": 500}), &mut view);
        assert!((value_ceiling(&socket) - 550.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_shows_readouts_in_titles() {
        let (handle, transport) = ChannelTransport::create("test");
        let dashboard = Dashboard::with_watchers(
            Arc::new(GraphConfig::default()),
            vec![WatcherEntry::new("web", "st")],
            vec![],
            vec![],
            vec!["st".into()],
        );
        let mut app = App::with_theme(Box::new(transport), dashboard, Theme::dark());
        handle.emit("stats-web-st", json!({"cpu": 42.0, "mem": 7.5}));
        app.pump();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(frame, &app, frame.area())).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("web-st"));
        assert!(text.contains("cpu 42.0%"));
        assert!(text.contains("mem 7.5%"));
    }
}

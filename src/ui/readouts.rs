//! Readouts view rendering.
//!
//! Displays a table of every visible graph with its latest readouts, sample
//! age, buffered point count and a sparkline trend.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::{Metric, RollingSeries};
use crate::graph::GraphBinding;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const SPARKLINE_WIDTH: usize = 8;

const METRICS: [Metric; 3] = [Metric::Cpu, Metric::Mem, Metric::Reads];

/// Render the readouts table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let graphs = app.visible_graphs();

    let mut header_cells = vec![Cell::from("Graph"), Cell::from("Event")];
    header_cells.extend(METRICS.iter().map(|m| Cell::from(m.name())));
    header_cells.extend([Cell::from("Age"), Cell::from("Points"), Cell::from("Trend")]);
    let header = Row::new(header_cells).height(1).style(app.theme.header);

    let rows: Vec<Row> = graphs.iter().map(|b| graph_row(app, b)).collect();

    let widths = [
        Constraint::Fill(3), // Graph
        Constraint::Fill(3), // Event
        Constraint::Fill(1), // cpu
        Constraint::Fill(1), // mem
        Constraint::Fill(1), // reads
        Constraint::Min(6),  // Age
        Constraint::Min(6),  // Points
        Constraint::Min(8),  // Trend
    ];

    let selected = app.selected_index.min(graphs.len().saturating_sub(1));

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if !graphs.is_empty() {
        format!(" [{}/{}]", selected + 1, graphs.len())
    } else {
        String::new()
    };

    let title = format!(
        " Graphs ({}/{}){}{} ",
        graphs.len(),
        app.dashboard.registry().len(),
        filter_info,
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !graphs.is_empty() {
        state.select(Some(selected));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn graph_row<'a>(app: &'a App, binding: &'a GraphBinding) -> Row<'a> {
    let mut cells = vec![
        Cell::from(binding.graph_id()),
        Cell::from(binding.event_name()),
    ];

    for metric in METRICS {
        let style = binding.series().iter().find(|s| s.metric == metric);
        let cell = match style {
            Some(style) => {
                let readout = app.screen.readout(binding.graph_id(), metric).unwrap_or("-");
                Cell::from(readout).style(Style::default().fg(app.theme.series_color(style)))
            }
            None => Cell::from(""),
        };
        cells.push(cell);
    }

    cells.push(Cell::from(app.screen.age(binding.graph_id()).unwrap_or("-")));
    cells.push(Cell::from(format!(
        "{}/{}",
        binding.buffer().len(),
        binding.buffer().capacity()
    )));

    let trend = binding
        .metrics()
        .next()
        .map(|metric| render_sparkline(binding.buffer(), metric))
        .unwrap_or_default();
    cells.push(Cell::from(trend));

    Row::new(cells)
}

/// Last few values of `metric`, scaled to the window's range.
fn render_sparkline(buffer: &RollingSeries, metric: Metric) -> String {
    let values: Vec<f64> = buffer.series(metric).into_iter().map(|(_, v)| v).collect();
    if values.is_empty() {
        return " ".repeat(SPARKLINE_WIDTH);
    }

    let recent = &values[values.len().saturating_sub(SPARKLINE_WIDTH)..];
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    recent
        .iter()
        .map(|&v| {
            let level = if range > 0.0 {
                ((v - min) / range * 7.0).round() as usize
            } else {
                0
            };
            SPARKLINE_CHARS[level.min(7)]
        })
        .collect()
}

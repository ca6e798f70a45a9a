//! Application state and navigation logic.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::dashboard::{Dashboard, DEFAULT_PUMP_LIMIT};
use crate::graph::GraphBinding;
use crate::source::Transport;
use crate::ui::{Screen, Theme};

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// One chart per graph.
    Graphs,
    /// Latest readouts of every graph in a table.
    Readouts,
}

impl View {
    /// Cycle to the other view.
    pub fn next(self) -> Self {
        match self {
            View::Graphs => View::Readouts,
            View::Readouts => View::Graphs,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Graphs => "Graphs",
            View::Readouts => "Readouts",
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    transport: Box<dyn Transport>,
    pub dashboard: Dashboard,
    pub screen: Screen,
    pub last_update: Option<Instant>,

    // Navigation state
    pub selected_index: usize,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading from `transport`.
    pub fn new(transport: Box<dyn Transport>, dashboard: Dashboard) -> Self {
        Self::with_theme(transport, dashboard, Theme::auto_detect())
    }

    pub fn with_theme(transport: Box<dyn Transport>, dashboard: Dashboard, theme: Theme) -> Self {
        Self {
            running: true,
            current_view: View::Graphs,
            show_help: false,
            transport,
            dashboard,
            screen: Screen::new(),
            last_update: None,
            selected_index: 0,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
        }
    }

    /// Returns a description of the current transport.
    pub fn source_description(&self) -> &str {
        self.transport.description()
    }

    /// Last error reported by the transport.
    pub fn transport_error(&self) -> Option<String> {
        self.transport.error()
    }

    /// Handle every pending transport event. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let handled =
            self.dashboard
                .pump(self.transport.as_mut(), &mut self.screen, DEFAULT_PUMP_LIMIT);
        if handled > 0 {
            self.last_update = Some(Instant::now());
            self.clamp_selection();
        }
        handled
    }

    /// Time since the last handled event.
    pub fn since_update(&self) -> Option<Duration> {
        self.last_update.map(|t| t.elapsed())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Graphs matching the current filter, in creation order.
    pub fn visible_graphs(&self) -> Vec<&GraphBinding> {
        self.dashboard
            .registry()
            .bindings()
            .iter()
            .filter(|b| self.matches_filter(b.graph_id()) || self.matches_filter(b.entity_id()))
            .collect()
    }

    /// The graph under the cursor.
    pub fn selected_graph(&self) -> Option<&GraphBinding> {
        self.visible_graphs().get(self.selected_index).copied()
    }

    /// Switch to the other view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible_graphs().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        self.selected_index = self.visible_graphs().len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_graphs().len();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.selected_index = 0;
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
        self.clamp_selection();
    }

    /// Check if a graph or entity id matches the current filter.
    pub fn matches_filter(&self, name: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        name.to_lowercase().contains(&self.filter_text.to_lowercase())
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export current readouts to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        write_export(path, &export_json(&self.dashboard, &self.screen))
    }
}

/// Current readouts of every graph as JSON.
pub fn export_json(dashboard: &Dashboard, screen: &Screen) -> Value {
    let graphs: Vec<Value> = dashboard
        .registry()
        .bindings()
        .iter()
        .map(|b| {
            let mut readouts = Map::new();
            let mut latest = Map::new();
            for metric in b.metrics() {
                if let Some(text) = screen.readout(b.graph_id(), metric) {
                    readouts.insert(metric.to_string(), json!(text));
                }
                if let Some(value) = b.buffer().latest(metric) {
                    latest.insert(metric.to_string(), json!(value));
                }
            }
            json!({
                "graph_id": b.graph_id(),
                "entity_id": b.entity_id(),
                "event": b.event_name(),
                "capped": b.caps_values(),
                "points": b.buffer().len(),
                "readouts": readouts,
                "latest": latest,
                "age": screen.age(b.graph_id()),
            })
        })
        .collect();

    json!({
        "summary": {
            "connected": dashboard.is_connected(),
            "graphs": graphs.len(),
            "events_handled": dashboard.events_handled(),
            "events_unrouted": dashboard.events_unrouted(),
            "bootstraps_sent": dashboard.session().sent_count(),
        },
        "graphs": graphs,
    })
}

/// Write an export document as pretty JSON.
pub fn write_export(path: &Path, export: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::GraphConfig;
    use crate::registry::{DynamicWatcherEntry, WatcherEntry};
    use crate::source::{ChannelHandle, ChannelTransport};

    fn app() -> (ChannelHandle, App) {
        let (handle, transport) = ChannelTransport::create("test");
        let dashboard = Dashboard::with_watchers(
            Arc::new(GraphConfig::default()),
            vec![WatcherEntry::new("web", "st"), WatcherEntry::new("sockets", "st")],
            vec![DynamicWatcherEntry::new("web", "st", "ctl")],
            vec!["ctl".into()],
            vec!["st".into()],
        );
        (handle, App::with_theme(Box::new(transport), dashboard, Theme::dark()))
    }

    #[test]
    fn test_pump_updates_screen() {
        let (handle, mut app) = app();
        assert!(app.since_update().is_none());

        handle.open();
        handle.emit("stats-web-st", serde_json::json!({"cpu": 5.0, "mem": 2.0, "age": 1.2}));
        assert_eq!(app.pump(), 2);

        assert!(app.dashboard.is_connected());
        assert_eq!(app.screen.readout("web-st", crate::data::Metric::Cpu), Some("5.0%"));
        assert_eq!(app.screen.age("web-st"), Some("(1s)"));
        assert!(app.since_update().is_some());
        assert_eq!(app.pump(), 0);
    }

    #[test]
    fn test_filter_and_selection() {
        let (handle, mut app) = app();
        handle.emit("stats-web-pids-ctl", serde_json::json!({"pids": [1, 2, 3]}));
        app.pump();
        assert_eq!(app.visible_graphs().len(), 5);

        app.select_last();
        assert_eq!(app.selected_index, 4);
        app.select_next();
        assert_eq!(app.selected_index, 4);

        for c in "web-2".chars() {
            app.filter_push(c);
        }
        assert_eq!(app.selected_index, 0);
        let visible: Vec<&str> = app.visible_graphs().iter().map(|b| b.graph_id()).collect();
        assert_eq!(visible, vec!["web-2-st"]);

        app.select_next_n(10);
        assert_eq!(app.selected_graph().unwrap().graph_id(), "web-2-st");

        app.clear_filter();
        assert_eq!(app.visible_graphs().len(), 5);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let (_handle, mut app) = app();
        app.filter_push('S');
        app.filter_push('O');
        let visible: Vec<&str> = app.visible_graphs().iter().map(|b| b.graph_id()).collect();
        assert_eq!(visible, vec!["socket-stats-st"]);
    }

    #[test]
    fn test_status_message() {
        let (_handle, mut app) = app();
        assert!(app.get_status_message().is_none());
        app.set_status_message("Exported".into());
        assert_eq!(app.get_status_message(), Some("Exported"));
    }

    #[test]
    fn test_export_state() {
        let (handle, mut app) = app();
        handle.open();
        handle.emit("socket-stats-st", serde_json::json!({"reads": 250, "age": 0.4}));
        app.pump();

        let file = tempfile::NamedTempFile::new().unwrap();
        app.export_state(file.path()).unwrap();

        let exported: Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(exported["summary"]["graphs"], 2);
        assert_eq!(exported["summary"]["bootstraps_sent"], 1);

        let sockets = &exported["graphs"][1];
        assert_eq!(sockets["graph_id"], "socket-stats-st");
        assert_eq!(sockets["capped"], false);
        assert_eq!(sockets["readouts"]["reads"], "250.0");
        assert_eq!(sockets["latest"]["reads"], 250.0);
        assert_eq!(sockets["age"], "(0s)");

        assert_eq!(exported["graphs"][0]["points"], 0);
        assert!(exported["graphs"][0]["age"].is_null());
    }

    #[test]
    fn test_view_cycles() {
        let (_handle, mut app) = app();
        assert_eq!(app.current_view, View::Graphs);
        app.next_view();
        assert_eq!(app.current_view.label(), "Readouts");
        app.next_view();
        assert_eq!(app.current_view, View::Graphs);
    }
}

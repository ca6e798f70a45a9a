//! Event dispatch for a dashboard session.
//!
//! The [`Dashboard`] ties the pieces together: it owns the event bus, the
//! watcher registry with every graph binding, and the session bootstrapper,
//! and routes each [`ChannelEvent`] a transport reports to whichever of them
//! handles it. Every handler runs to completion before the next event is
//! polled.

use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::bus::{EventBus, Route};
use crate::config::{DashboardConfig, GraphConfig};
use crate::graph::{GraphFactory, Presentation};
use crate::registry::{DynamicWatcherEntry, WatcherEntry, WatcherRegistry};
use crate::session::SessionBootstrapper;
use crate::source::{ChannelEvent, InboundEvent, Transport};

/// Default cap on events handled per [`Dashboard::pump`] call.
pub const DEFAULT_PUMP_LIMIT: usize = 512;

/// Graph bindings, watcher discovery and session state for one dashboard.
#[derive(Debug)]
pub struct Dashboard {
    bus: EventBus,
    registry: WatcherRegistry,
    session: SessionBootstrapper,
    connected: bool,
    events_handled: u64,
    events_unrouted: u64,
}

impl Dashboard {
    /// Build a dashboard from loaded configuration.
    pub fn new(config: &DashboardConfig) -> Self {
        Self::with_watchers(
            Arc::new(config.graph.clone()),
            config.watchers.clone(),
            config.dynamic_watchers.clone(),
            config.endpoints.clone(),
            config.stats_endpoints.clone(),
        )
    }

    /// Build a dashboard, creating static graphs and membership
    /// subscriptions right away.
    pub fn with_watchers(
        graph: Arc<GraphConfig>,
        watchers: Vec<WatcherEntry>,
        dynamic_watchers: Vec<DynamicWatcherEntry>,
        endpoints: Vec<String>,
        stats_endpoints: Vec<String>,
    ) -> Self {
        let mut bus = EventBus::new();
        let registry = WatcherRegistry::register(
            &mut bus,
            GraphFactory::new(graph),
            watchers,
            dynamic_watchers,
            endpoints,
            stats_endpoints,
        );
        let session = SessionBootstrapper::new(registry.bootstrap_request());

        Self {
            bus,
            registry,
            session,
            connected: false,
            events_handled: 0,
            events_unrouted: 0,
        }
    }

    /// Handle one transport event.
    pub fn handle(
        &mut self,
        event: ChannelEvent,
        transport: &mut dyn Transport,
        view: &mut dyn Presentation,
    ) {
        match event {
            ChannelEvent::Open => {
                info!("Connected to {}", transport.description());
                self.connected = true;
                if let Err(e) = self.session.on_open(transport) {
                    warn!("Failed to send get_stats: {}", e);
                }
            }
            ChannelEvent::Closed(reason) => {
                info!(reason = reason.as_deref().unwrap_or("unknown"), "Connection closed");
                self.connected = false;
                self.session.on_close();
            }
            ChannelEvent::Message(event) => {
                self.dispatch(&event, view);
            }
        }
    }

    /// Run every handler subscribed to `event`. Returns how many ran.
    pub fn dispatch(&mut self, event: &InboundEvent, view: &mut dyn Presentation) -> usize {
        let routes = self.bus.routes(&event.name);
        if routes.is_empty() {
            trace!(event = %event.name, "No subscriber for event");
            self.events_unrouted += 1;
            return 0;
        }

        for route in &routes {
            match route {
                Route::Graph(graph_id) => {
                    if let Some(binding) = self.registry.binding_mut(graph_id) {
                        binding.apply(&event.payload, view);
                    }
                }
                Route::PidMembership(watcher) | Route::FdMembership(watcher) => {
                    self.registry.handle_membership(&mut self.bus, *watcher, &event.payload);
                }
            }
        }
        self.events_handled += 1;
        routes.len()
    }

    /// Poll `transport` and handle events until it has nothing pending or
    /// `limit` events were handled. Returns the number handled.
    pub fn pump(
        &mut self,
        transport: &mut dyn Transport,
        view: &mut dyn Presentation,
        limit: usize,
    ) -> usize {
        let mut handled = 0;
        while handled < limit {
            let Some(event) = transport.poll() else {
                break;
            };
            self.handle(event, transport, view);
            handled += 1;
        }
        handled
    }

    /// Unsubscribe and drop one graph.
    pub fn teardown(&mut self, graph_id: &str) -> bool {
        self.registry.teardown(&mut self.bus, graph_id)
    }

    pub fn registry(&self) -> &WatcherRegistry {
        &self.registry
    }

    pub fn session(&self) -> &SessionBootstrapper {
        &self.session
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Inbound events that reached at least one handler.
    pub fn events_handled(&self) -> u64 {
        self.events_handled
    }

    /// Inbound events nobody was subscribed to.
    pub fn events_unrouted(&self) -> u64 {
        self.events_unrouted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use crate::graph::RecordingView;
    use crate::source::ChannelTransport;
    use serde_json::{json, Value};

    fn dashboard() -> Dashboard {
        Dashboard::with_watchers(
            Arc::new(GraphConfig::default()),
            vec![WatcherEntry::new("web", "st"), WatcherEntry::new("sockets", "st")],
            vec![
                DynamicWatcherEntry::new("default", "st", "ctl"),
                DynamicWatcherEntry::new("sockets", "st", "ctl"),
            ],
            vec!["ctl".into()],
            vec!["st".into()],
        )
    }

    #[test]
    fn test_nothing_is_sent_before_open() {
        let (mut handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        handle.emit("stats-web-st", json!({"cpu": 1, "mem": 1}));
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        assert!(handle.sent_messages().is_empty());
        assert!(!dash.is_connected());
    }

    #[test]
    fn test_open_sends_bootstrap_with_every_declared_watcher() {
        let (mut handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        handle.open();
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        let sent = handle.sent_messages();
        assert_eq!(sent.len(), 1);
        let message: Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(
            message,
            json!({
                "name": "get_stats",
                "watchers": ["web", "sockets"],
                "watchersWithPids": [["default", "ctl"], ["sockets", "ctl"]],
                "endpoints": ["ctl"],
                "stats_endpoints": ["st"]
            })
        );
        assert!(dash.is_connected());
    }

    #[test]
    fn test_every_open_sends_bootstrap() {
        let (mut handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        handle.open();
        handle.open();
        handle.close();
        handle.open();
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        assert_eq!(handle.sent_messages().len(), 3);
        assert_eq!(dash.session().sent_count(), 3);
    }

    #[test]
    fn test_metric_events_reach_static_bindings() {
        let (handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        handle.open();
        handle.emit("stats-web-st", json!({"cpu": 123.4, "mem": 12.0}));
        handle.emit("socket-stats-st", json!({"reads": 42, "age": 3.7, "addresses": []}));
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        assert_eq!(view.texts["web-st_last_cpu"], "100.0%");
        assert_eq!(view.texts["web-st_last_mem"], "12.0%");
        assert_eq!(view.texts["socket-stats-st_last_reads"], "42.0");
        assert_eq!(view.texts["socket-stats-st_last_age"], "(4s)");
        assert_eq!(view.renders, vec!["web-st".to_string(), "socket-stats-st".to_string()]);
    }

    #[test]
    fn test_discovery_then_metrics_for_new_pid() {
        let (handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        handle.open();
        handle.emit("stats-default-pids-ctl", json!({"pids": [7, 7, 9]}));
        handle.emit("stats-default-pids-ctl", json!({"pids": [7, 7, 9]}));
        handle.emit("stats-default-7-st", json!({"cpu": 50.0, "mem": 150.0}));
        handle.emit("socket-stats-fds-ctl", json!({"fds": [12]}));
        handle.emit("socket-stats-12-st", json!({"reads": 3}));
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        // web + sockets aggregates, pids 7 and 9, fd 12
        assert_eq!(dash.registry().len(), 5);
        assert_eq!(dash.bus().routes("stats-default-7-st").len(), 1);

        let pid = dash.registry().binding("default-7-st").unwrap();
        assert_eq!(pid.buffer().latest(Metric::Mem), Some(100.0));
        assert_eq!(view.texts["default-7-st_last_mem"], "100.0%");

        let fd = dash.registry().binding("socket-stats-12-st").unwrap();
        assert_eq!(fd.buffer().latest(Metric::Reads), Some(3.0));
    }

    #[test]
    fn test_unrouted_events_are_counted() {
        let (handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        handle.emit("stats-unknown-st", json!({"cpu": 1}));
        handle.emit("stats-web-st", json!({"cpu": 1}));
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        assert_eq!(dash.events_unrouted(), 1);
        assert_eq!(dash.events_handled(), 1);
    }

    #[test]
    fn test_pump_respects_limit() {
        let (handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        for _ in 0..5 {
            handle.emit("stats-web-st", json!({"cpu": 1, "mem": 1}));
        }

        assert_eq!(dash.pump(&mut transport, &mut view, 3), 3);
        assert_eq!(dash.pump(&mut transport, &mut view, 3), 2);
        assert_eq!(dash.pump(&mut transport, &mut view, 3), 0);
    }

    #[test]
    fn test_teardown_stops_updates() {
        let (handle, mut transport) = ChannelTransport::create("test");
        let mut dash = dashboard();
        let mut view = RecordingView::default();

        assert!(dash.teardown("web-st"));
        handle.emit("stats-web-st", json!({"cpu": 1, "mem": 1}));
        dash.pump(&mut transport, &mut view, DEFAULT_PUMP_LIMIT);

        assert!(view.renders.is_empty());
        assert_eq!(dash.events_unrouted(), 1);
    }
}

//! Watcher declarations and discovery of their members.
//!
//! Static watchers get one aggregate graph each at registration. Dynamic
//! watchers subscribe to a membership event; each time the backend pushes the
//! list of PIDs (or socket FDs) for such a watcher, a graph is created for
//! every member not seen before.
//!
//! Every binding is keyed by its graph id, so repeated membership pushes,
//! which carry the full current membership rather than deltas, never create
//! a second graph for the same entity.
//!
//! Members that disappear from a later push keep their graph. Whether pushes
//! are cumulative or deltas is not known, so no removal policy is applied;
//! [`WatcherRegistry::teardown`] exists for callers that know better.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::bus::{EventBus, Route};
use crate::config::GraphConfig;
use crate::error::ConfigError;
use crate::graph::{BindingSpec, GraphBinding, GraphFactory};
use crate::session::GetStats;

/// Watcher name reserved for the supervisor's sockets.
pub const SOCKETS: &str = "sockets";

/// A watcher graphed as a single aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherEntry {
    pub name: String,
    pub stats_endpoint: String,
}

impl WatcherEntry {
    pub fn new(name: impl Into<String>, stats_endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats_endpoint: stats_endpoint.into(),
        }
    }

    pub fn is_sockets(&self) -> bool {
        self.name == SOCKETS
    }

    /// The aggregate graph for this watcher.
    pub fn binding_spec(&self) -> BindingSpec {
        if self.is_sockets() {
            BindingSpec::socket("socket-stats", format!("socket-stats-{}", self.stats_endpoint))
        } else {
            BindingSpec::process(
                self.name.clone(),
                format!("{}-{}", self.name, self.stats_endpoint),
            )
        }
    }
}

/// Parses `name=stats_endpoint`.
impl FromStr for WatcherEntry {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, stats)) if !name.trim().is_empty() && !stats.trim().is_empty() => {
                Ok(Self::new(name.trim(), stats.trim()))
            }
            _ => Err(ConfigError::Invalid(format!(
                "expected name=stats_endpoint, got '{}'",
                s
            ))),
        }
    }
}

/// A watcher whose members are discovered and graphed one by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicWatcherEntry {
    pub name: String,
    pub stats_endpoint: String,
    pub data_endpoint: String,
}

impl DynamicWatcherEntry {
    pub fn new(
        name: impl Into<String>,
        stats_endpoint: impl Into<String>,
        data_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            stats_endpoint: stats_endpoint.into(),
            data_endpoint: data_endpoint.into(),
        }
    }

    pub fn is_sockets(&self) -> bool {
        self.name == SOCKETS
    }

    /// Event carrying this watcher's current members.
    pub fn membership_event(&self) -> String {
        if self.is_sockets() {
            format!("socket-stats-fds-{}", self.data_endpoint)
        } else {
            format!("stats-{}-pids-{}", self.name, self.data_endpoint)
        }
    }

    /// Payload key listing the members: `fds` for sockets, `pids` otherwise.
    pub fn membership_key(&self) -> &'static str {
        if self.is_sockets() {
            "fds"
        } else {
            "pids"
        }
    }

    /// The graph for one member PID or FD.
    pub fn member_spec(&self, member: u64) -> BindingSpec {
        if self.is_sockets() {
            let entity = format!("socket-stats-{}", member);
            let graph_id = format!("{}-{}", entity, self.stats_endpoint);
            BindingSpec::socket(entity, graph_id)
        } else {
            let entity = format!("{}-{}", self.name, member);
            let graph_id = format!("{}-{}", entity, self.stats_endpoint);
            BindingSpec::process(entity, graph_id)
        }
    }
}

/// Parses `name=stats_endpoint,data_endpoint`.
impl FromStr for DynamicWatcherEntry {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ConfigError::Invalid(format!(
                "expected name=stats_endpoint,data_endpoint, got '{}'",
                s
            ))
        };
        let (name, endpoints) = s.split_once('=').ok_or_else(invalid)?;
        let (stats, data) = endpoints.split_once(',').ok_or_else(invalid)?;
        let (name, stats, data) = (name.trim(), stats.trim(), data.trim());
        if name.is_empty() || stats.is_empty() || data.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(name, stats, data))
    }
}

/// Member ids in a membership payload. Integral numbers (`7` or `7.0`) and
/// numeric strings are accepted, anything else is skipped.
fn member_ids(payload: &Value, key: &str) -> Vec<u64> {
    let Some(members) = payload.get(key).and_then(Value::as_array) else {
        warn!(key, "Membership event without member list");
        return Vec::new();
    };

    members
        .iter()
        .filter_map(|m| {
            let id = match m {
                Value::Number(n) => n.as_u64().or_else(|| {
                    n.as_f64()
                        .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u64::MAX as f64)
                        .map(|v| v as u64)
                }),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            if id.is_none() {
                trace!(key, member = %m, "Skipping member id");
            }
            id
        })
        .collect()
}

/// Declared watchers plus every live binding, keyed by graph id.
#[derive(Debug)]
pub struct WatcherRegistry {
    factory: GraphFactory,
    watchers: Vec<WatcherEntry>,
    dynamic_watchers: Vec<DynamicWatcherEntry>,
    endpoints: Vec<String>,
    stats_endpoints: Vec<String>,
    bindings: Vec<GraphBinding>,
    index: HashMap<String, usize>,
    /// Graph id -> dynamic watcher that discovered it.
    members: HashMap<String, usize>,
}

impl WatcherRegistry {
    /// Register watchers: create the static graphs now and subscribe to
    /// membership events for the dynamic ones.
    pub fn register(
        bus: &mut EventBus,
        factory: GraphFactory,
        watchers: Vec<WatcherEntry>,
        dynamic_watchers: Vec<DynamicWatcherEntry>,
        endpoints: Vec<String>,
        stats_endpoints: Vec<String>,
    ) -> Self {
        let mut registry = Self {
            factory,
            watchers,
            dynamic_watchers,
            endpoints,
            stats_endpoints,
            bindings: Vec::new(),
            index: HashMap::new(),
            members: HashMap::new(),
        };

        let specs: Vec<BindingSpec> = registry.watchers.iter().map(WatcherEntry::binding_spec).collect();
        for spec in specs {
            registry.ensure_binding(bus, spec);
        }

        for (i, watcher) in registry.dynamic_watchers.iter().enumerate() {
            let route = if watcher.is_sockets() {
                Route::FdMembership(i)
            } else {
                Route::PidMembership(i)
            };
            bus.subscribe(watcher.membership_event(), route);
        }

        registry
    }

    /// Create a binding unless one with the same graph id is already live.
    ///
    /// Returns true if a binding was created.
    pub fn ensure_binding(&mut self, bus: &mut EventBus, spec: BindingSpec) -> bool {
        if self.index.contains_key(&spec.graph_id) {
            return false;
        }
        let binding = self.factory.create(bus, spec);
        self.index.insert(binding.graph_id().to_string(), self.bindings.len());
        self.bindings.push(binding);
        true
    }

    /// Handle a membership event for the dynamic watcher at `watcher`.
    ///
    /// Returns the graph ids created for previously unseen members.
    pub fn handle_membership(
        &mut self,
        bus: &mut EventBus,
        watcher: usize,
        payload: &Value,
    ) -> Vec<String> {
        let Some(entry) = self.dynamic_watchers.get(watcher).cloned() else {
            warn!(watcher, "Membership event for unknown watcher");
            return Vec::new();
        };

        let mut created = Vec::new();
        for member in member_ids(payload, entry.membership_key()) {
            let spec = entry.member_spec(member);
            let graph_id = spec.graph_id.clone();
            if self.ensure_binding(bus, spec) {
                self.members.insert(graph_id.clone(), watcher);
                created.push(graph_id);
            } else if self.members.get(&graph_id) != Some(&watcher) {
                warn!(
                    watcher = %entry.name,
                    member,
                    graph_id = %graph_id,
                    "Member graph id already used by another graph"
                );
            }
        }

        if !created.is_empty() {
            debug!(watcher = %entry.name, count = created.len(), "Discovered new members");
        }
        created
    }

    /// Unsubscribe and drop the binding for `graph_id`.
    pub fn teardown(&mut self, bus: &mut EventBus, graph_id: &str) -> bool {
        let Some(position) = self.index.remove(graph_id) else {
            return false;
        };
        self.members.remove(graph_id);
        let mut binding = self.bindings.remove(position);
        binding.teardown(bus);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        true
    }

    /// The `get_stats` request covering every declared watcher.
    pub fn bootstrap_request(&self) -> GetStats {
        GetStats::new(
            self.watchers.iter().map(|w| w.name.clone()).collect(),
            self.dynamic_watchers
                .iter()
                .map(|w| (w.name.clone(), w.data_endpoint.clone()))
                .collect(),
            self.endpoints.clone(),
            self.stats_endpoints.clone(),
        )
    }

    pub fn binding(&self, graph_id: &str) -> Option<&GraphBinding> {
        self.index.get(graph_id).map(|&i| &self.bindings[i])
    }

    pub fn binding_mut(&mut self, graph_id: &str) -> Option<&mut GraphBinding> {
        self.index.get(graph_id).map(|&i| &mut self.bindings[i])
    }

    /// Live bindings in creation order.
    pub fn bindings(&self) -> &[GraphBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Configuration shared by every binding.
    pub fn graph_config(&self) -> &Arc<GraphConfig> {
        self.factory.config()
    }

    pub fn watchers(&self) -> &[WatcherEntry] {
        &self.watchers
    }

    pub fn dynamic_watchers(&self) -> &[DynamicWatcherEntry] {
        &self.dynamic_watchers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use serde_json::json;

    fn registry(
        bus: &mut EventBus,
        watchers: Vec<WatcherEntry>,
        dynamic: Vec<DynamicWatcherEntry>,
    ) -> WatcherRegistry {
        let factory = GraphFactory::new(Arc::new(GraphConfig::default()));
        WatcherRegistry::register(bus, factory, watchers, dynamic, vec!["ctl".into()], vec!["st".into()])
    }

    #[test]
    fn test_static_watchers_get_bindings_immediately() {
        let mut bus = EventBus::new();
        let reg = registry(
            &mut bus,
            vec![WatcherEntry::new("web", "st"), WatcherEntry::new("sockets", "st")],
            vec![],
        );

        assert_eq!(reg.len(), 2);

        let web = reg.binding("web-st").unwrap();
        assert_eq!(web.event_name(), "stats-web-st");
        assert!(web.caps_values());

        let sockets = reg.binding("socket-stats-st").unwrap();
        assert_eq!(sockets.event_name(), "socket-stats-st");
        assert_eq!(sockets.entity_id(), "socket-stats");
        assert!(!sockets.caps_values());
        assert_eq!(sockets.metrics().collect::<Vec<_>>(), vec![Metric::Reads]);
    }

    #[test]
    fn test_dynamic_watchers_subscribe_to_membership() {
        let mut bus = EventBus::new();
        let reg = registry(
            &mut bus,
            vec![],
            vec![
                DynamicWatcherEntry::new("web", "st", "ctl"),
                DynamicWatcherEntry::new("sockets", "st", "ctl"),
            ],
        );

        assert!(reg.is_empty());
        assert_eq!(bus.routes("stats-web-pids-ctl"), vec![Route::PidMembership(0)]);
        assert_eq!(bus.routes("socket-stats-fds-ctl"), vec![Route::FdMembership(1)]);
    }

    #[test]
    fn test_duplicate_pids_create_one_binding_each() {
        let mut bus = EventBus::new();
        let mut reg = registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("web", "st", "ctl")]);
        let payload = json!({"pids": [7, 7, 9]});

        let created = reg.handle_membership(&mut bus, 0, &payload);
        assert_eq!(created, vec!["web-7-st".to_string(), "web-9-st".to_string()]);

        let again = reg.handle_membership(&mut bus, 0, &payload);
        assert!(again.is_empty());
        assert_eq!(reg.len(), 2);
        assert_eq!(bus.routes("stats-web-7-st").len(), 1);
    }

    #[test]
    fn test_growing_membership_adds_only_new_pids() {
        let mut bus = EventBus::new();
        let mut reg =
            registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("default", "st", "ctl")]);

        let first = reg.handle_membership(&mut bus, 0, &json!({"pids": [101]}));
        assert_eq!(first, vec!["default-101-st".to_string()]);

        let second = reg.handle_membership(&mut bus, 0, &json!({"pids": [101, 102]}));
        assert_eq!(second, vec!["default-102-st".to_string()]);

        assert_eq!(reg.len(), 2);
        let pid = reg.binding("default-101-st").unwrap();
        assert_eq!(pid.entity_id(), "default-101");
        assert!(pid.caps_values());
    }

    #[test]
    fn test_vanished_members_keep_their_binding() {
        let mut bus = EventBus::new();
        let mut reg = registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("web", "st", "ctl")]);

        reg.handle_membership(&mut bus, 0, &json!({"pids": [1, 2]}));
        reg.handle_membership(&mut bus, 0, &json!({"pids": [2]}));

        assert!(reg.binding("web-1-st").is_some());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_socket_fds_create_uncapped_read_bindings() {
        let mut bus = EventBus::new();
        let mut reg =
            registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("sockets", "st", "ctl")]);

        let created = reg.handle_membership(&mut bus, 0, &json!({"fds": [5, "6", -1, "x"]}));
        assert_eq!(created, vec!["socket-stats-5-st".to_string(), "socket-stats-6-st".to_string()]);

        let fd = reg.binding("socket-stats-5-st").unwrap();
        assert_eq!(fd.entity_id(), "socket-stats-5");
        assert_eq!(fd.event_name(), "socket-stats-5-st");
        assert!(!fd.caps_values());
    }

    #[test]
    fn test_malformed_membership_is_ignored() {
        let mut bus = EventBus::new();
        let mut reg = registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("web", "st", "ctl")]);

        assert!(reg.handle_membership(&mut bus, 0, &json!({"fds": [1]})).is_empty());
        assert!(reg.handle_membership(&mut bus, 0, &json!({"pids": "1"})).is_empty());
        assert!(reg.handle_membership(&mut bus, 5, &json!({"pids": [1]})).is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_integral_float_and_string_member_ids() {
        let mut bus = EventBus::new();
        let mut reg = registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("web", "st", "ctl")]);

        let created =
            reg.handle_membership(&mut bus, 0, &json!({"pids": [7.0, "8", 9.5, -1, null]}));
        assert_eq!(created, vec!["web-7-st".to_string(), "web-8-st".to_string()]);

        assert!(reg.handle_membership(&mut bus, 0, &json!({"pids": [7]})).is_empty());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_member_colliding_with_static_graph_keeps_static_binding() {
        let mut bus = EventBus::new();
        let mut reg = registry(
            &mut bus,
            vec![WatcherEntry::new("web-7", "st")],
            vec![DynamicWatcherEntry::new("web", "st", "ctl")],
        );

        let created = reg.handle_membership(&mut bus, 0, &json!({"pids": [7]}));
        assert!(created.is_empty());
        assert_eq!(reg.len(), 1);
        assert!(!reg.members.contains_key("web-7-st"));

        let binding = reg.binding("web-7-st").unwrap();
        assert_eq!(binding.entity_id(), "web-7");
        assert_eq!(bus.routes("stats-web-7-st").len(), 1);
    }

    #[test]
    fn test_bootstrap_request_lists_declared_watchers() {
        let mut bus = EventBus::new();
        let reg = registry(
            &mut bus,
            vec![WatcherEntry::new("web", "st"), WatcherEntry::new("sockets", "st")],
            vec![DynamicWatcherEntry::new("worker", "st", "ctl")],
        );

        let request = reg.bootstrap_request();
        assert_eq!(request.name, "get_stats");
        assert_eq!(request.watchers, vec!["web".to_string(), "sockets".to_string()]);
        assert_eq!(request.watchers_with_pids, vec![("worker".to_string(), "ctl".to_string())]);
        assert_eq!(request.endpoints, vec!["ctl".to_string()]);
        assert_eq!(request.stats_endpoints, vec!["st".to_string()]);
    }

    #[test]
    fn test_teardown_removes_binding_and_keeps_index_consistent() {
        let mut bus = EventBus::new();
        let mut reg = registry(&mut bus, vec![], vec![DynamicWatcherEntry::new("web", "st", "ctl")]);
        reg.handle_membership(&mut bus, 0, &json!({"pids": [1, 2, 3]}));

        assert!(reg.teardown(&mut bus, "web-1-st"));
        assert!(!reg.teardown(&mut bus, "web-1-st"));
        assert!(!bus.is_subscribed("stats-web-1-st"));

        assert_eq!(reg.binding("web-3-st").unwrap().graph_id(), "web-3-st");
        assert_eq!(reg.binding("web-2-st").unwrap().graph_id(), "web-2-st");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_parse_watcher_arguments() {
        let watcher: WatcherEntry = "web=st".parse().unwrap();
        assert_eq!(watcher, WatcherEntry::new("web", "st"));

        let dynamic: DynamicWatcherEntry = "web = st, ctl".parse().unwrap();
        assert_eq!(dynamic, DynamicWatcherEntry::new("web", "st", "ctl"));

        assert!("web".parse::<WatcherEntry>().is_err());
        assert!("=st".parse::<WatcherEntry>().is_err());
        assert!("web=st".parse::<DynamicWatcherEntry>().is_err());
        assert!("web=st,".parse::<DynamicWatcherEntry>().is_err());
    }
}

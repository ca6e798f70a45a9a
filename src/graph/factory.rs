//! Building graph bindings.

use std::sync::Arc;

use tracing::debug;

use super::binding::{GraphBinding, SeriesStyle};
use crate::bus::{EventBus, Route};
use crate::config::GraphConfig;
use crate::data::{Metric, ValueFormatter};

/// Event prefix for process and watcher metrics.
pub const STATS_PREFIX: &str = "stats-";

/// What to build: identity, metrics, event prefix and capping policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSpec {
    pub entity_id: String,
    pub graph_id: String,
    pub metrics: Vec<Metric>,
    pub event_prefix: String,
    pub cap_values: bool,
}

impl BindingSpec {
    /// A capped `cpu`/`mem` graph listening on `stats-<graph_id>`.
    pub fn process(entity_id: impl Into<String>, graph_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            graph_id: graph_id.into(),
            metrics: Metric::PROCESS.to_vec(),
            event_prefix: STATS_PREFIX.to_string(),
            cap_values: true,
        }
    }

    /// An uncapped `reads` graph listening on the bare graph id.
    pub fn socket(entity_id: impl Into<String>, graph_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            graph_id: graph_id.into(),
            metrics: Metric::SOCKET.to_vec(),
            event_prefix: String::new(),
            cap_values: false,
        }
    }

    pub fn event_name(&self) -> String {
        format!("{}{}", self.event_prefix, self.graph_id)
    }
}

/// Creates bindings that share one graph configuration.
#[derive(Debug, Clone)]
pub struct GraphFactory {
    config: Arc<GraphConfig>,
}

impl GraphFactory {
    pub fn new(config: Arc<GraphConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<GraphConfig> {
        &self.config
    }

    /// Build a binding and subscribe it to its event on `bus`.
    pub fn create(&self, bus: &mut EventBus, spec: BindingSpec) -> GraphBinding {
        let event = spec.event_name();
        let series = spec
            .metrics
            .iter()
            .map(|&metric| SeriesStyle {
                metric,
                color: self.config.color(metric),
            })
            .collect();
        let subscription = bus.subscribe(event.clone(), Route::Graph(spec.graph_id.clone()));

        debug!(graph = %spec.graph_id, event = %event, "Created graph binding");

        GraphBinding::new(
            spec.entity_id,
            spec.graph_id,
            event,
            series,
            ValueFormatter::new(spec.cap_values),
            Arc::clone(&self.config),
            subscription,
        )
    }
}

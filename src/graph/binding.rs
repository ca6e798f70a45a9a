//! A live graph for one monitored entity.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::bus::{EventBus, SubscriptionId};
use crate::config::{GraphConfig, RgbColor};
use crate::data::{Metric, MetricSample, RollingSeries, ValueFormatter};

/// The presentation side of a graph: readout text and redraws.
///
/// Element ids follow [`value_element_id`] and [`age_element_id`]; the chart
/// itself is identified by the graph id.
pub trait Presentation {
    /// Replace the text of a readout element.
    fn set_text(&mut self, element_id: &str, value: String);

    /// Ask for the chart of `graph_id` to be redrawn.
    fn request_render(&mut self, graph_id: &str);
}

/// Element holding the latest readout of `metric` on a graph.
pub fn value_element_id(graph_id: &str, metric: Metric) -> String {
    format!("{}_last_{}", graph_id, metric)
}

/// Element holding the sample age readout on a graph.
pub fn age_element_id(graph_id: &str) -> String {
    format!("{}_last_age", graph_id)
}

/// One named line on a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub metric: Metric,
    pub color: Option<RgbColor>,
}

/// Subscription, rolling buffer and readouts for one process, socket or
/// watcher aggregate.
///
/// A binding listens to exactly one event name for its whole life and its
/// metric set is fixed at construction.
#[derive(Debug)]
pub struct GraphBinding {
    entity_id: String,
    graph_id: String,
    event: String,
    series: Vec<SeriesStyle>,
    formatter: ValueFormatter,
    buffer: RollingSeries,
    config: Arc<GraphConfig>,
    subscription: Option<SubscriptionId>,
}

impl GraphBinding {
    pub(crate) fn new(
        entity_id: String,
        graph_id: String,
        event: String,
        series: Vec<SeriesStyle>,
        formatter: ValueFormatter,
        config: Arc<GraphConfig>,
        subscription: SubscriptionId,
    ) -> Self {
        let buffer = RollingSeries::starting_now(config.data_size, config.delay);
        Self {
            entity_id,
            graph_id,
            event,
            series,
            formatter,
            buffer,
            config,
            subscription: Some(subscription),
        }
    }

    /// Apply one metric event.
    ///
    /// Each tracked metric present in the payload updates its readout and
    /// contributes to a new data point; missing or non-numeric metrics are
    /// skipped. Returns true if a point was appended and a redraw requested.
    pub fn apply(&mut self, payload: &Value, view: &mut dyn Presentation) -> bool {
        let sample = MetricSample::new(payload);
        let mut point = BTreeMap::new();

        for style in &self.series {
            let Some(raw) = sample.value(style.metric) else {
                trace!(graph = %self.graph_id, metric = %style.metric, "Sample without metric");
                continue;
            };
            let formatted = self.formatter.format(style.metric, raw);
            view.set_text(&value_element_id(&self.graph_id, style.metric), formatted.display);
            point.insert(style.metric, formatted.chart);
        }

        if let Some(age) = sample.age() {
            view.set_text(&age_element_id(&self.graph_id), ValueFormatter::format_age(age));
        }

        if point.is_empty() {
            return false;
        }

        self.buffer.push(point);
        view.request_render(&self.graph_id);
        true
    }

    /// Unsubscribe and release the buffer.
    pub fn teardown(&mut self, bus: &mut EventBus) {
        if let Some(id) = self.subscription.take() {
            bus.unsubscribe(id);
        }
        self.buffer.clear();
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    /// The one event name this binding listens to.
    pub fn event_name(&self) -> &str {
        &self.event
    }

    pub fn series(&self) -> &[SeriesStyle] {
        &self.series
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.series.iter().map(|s| s.metric)
    }

    pub fn caps_values(&self) -> bool {
        self.formatter.caps_values()
    }

    pub fn buffer(&self) -> &RollingSeries {
        &self.buffer
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
}

/// Presentation that records everything, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingView {
    pub texts: std::collections::HashMap<String, String>,
    pub renders: Vec<String>,
}

#[cfg(test)]
impl Presentation for RecordingView {
    fn set_text(&mut self, element_id: &str, value: String) {
        self.texts.insert(element_id.to_string(), value);
    }

    fn request_render(&mut self, graph_id: &str) {
        self.renders.push(graph_id.to_string());
    }
}

//! Readout text and redraw bookkeeping for the terminal.
//!
//! Graph bindings write into a [`Screen`] through [`Presentation`]; the
//! render loop reads it back when drawing chart titles and the readout
//! table.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::data::Metric;
use crate::graph::{age_element_id, value_element_id, Presentation};

/// Text elements and pending redraws, keyed by element and graph id.
#[derive(Debug, Default)]
pub struct Screen {
    texts: HashMap<String, String>,
    dirty: HashSet<String>,
    renders: u64,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text of an element.
    pub fn text(&self, element_id: &str) -> Option<&str> {
        self.texts.get(element_id).map(String::as_str)
    }

    /// Latest readout of `metric` on a graph.
    pub fn readout(&self, graph_id: &str, metric: Metric) -> Option<&str> {
        self.text(&value_element_id(graph_id, metric))
    }

    /// Age readout of a graph, e.g. `(4s)`.
    pub fn age(&self, graph_id: &str) -> Option<&str> {
        self.text(&age_element_id(graph_id))
    }

    /// Every element in id order.
    pub fn elements(&self) -> BTreeMap<&str, &str> {
        self.texts.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    /// Whether `graph_id` asked for a redraw since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self, graph_id: &str) -> bool {
        self.dirty.contains(graph_id)
    }

    /// Clear pending redraws, returning true if there were any.
    pub fn take_dirty(&mut self) -> bool {
        let any = !self.dirty.is_empty();
        self.dirty.clear();
        any
    }

    /// Total redraw requests received.
    pub fn render_requests(&self) -> u64 {
        self.renders
    }
}

impl Presentation for Screen {
    fn set_text(&mut self, element_id: &str, value: String) {
        self.texts.insert(element_id.to_string(), value);
    }

    fn request_render(&mut self, graph_id: &str) {
        self.renders += 1;
        self.dirty.insert(graph_id.to_string());
    }
}

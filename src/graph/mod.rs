//! Graph bindings: one rolling buffer and set of readouts per entity.

mod binding;
mod factory;

pub use binding::{age_element_id, value_element_id, GraphBinding, Presentation, SeriesStyle};
pub use factory::{BindingSpec, GraphFactory, STATS_PREFIX};

#[cfg(test)]
pub(crate) use binding::RecordingView;

//! Metric values and the buffers that hold them.
//!
//! ## Submodules
//!
//! - [`metric`]: The metric vocabulary ([`Metric`]) and inbound [`MetricSample`]s
//! - [`format`]: Capping and readout formatting ([`ValueFormatter`])
//! - [`series`]: Fixed-duration rolling buffers ([`RollingSeries`])
//!
//! ## Data Flow
//!
//! ```text
//! event payload (JSON)
//!        │
//!        ▼
//! MetricSample::value()
//!        │
//!        ▼
//! ValueFormatter::format() ──▶ readout text
//!        │
//!        ▼
//! RollingSeries::push() ──▶ chart
//! ```

pub mod format;
pub mod metric;
pub mod series;

pub use format::{FormattedValue, ValueFormatter, CAP};
pub use metric::{Metric, MetricSample};
pub use series::{DataPoint, RollingSeries};

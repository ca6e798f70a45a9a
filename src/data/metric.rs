//! Metric vocabulary and inbound metric samples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A metric the supervisor streams for a process or socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// CPU usage in percent.
    Cpu,
    /// Memory usage in percent.
    Mem,
    /// Socket reads since the last sample (not a percentage).
    Reads,
}

impl Metric {
    /// Metrics tracked for a process or an aggregated watcher.
    pub const PROCESS: [Metric; 2] = [Metric::Cpu, Metric::Mem];

    /// Metrics tracked for a socket.
    pub const SOCKET: [Metric; 1] = [Metric::Reads];

    /// The key this metric uses in event payloads and element ids.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Mem => "mem",
            Metric::Reads => "reads",
        }
    }

    /// Whether display values carry a `%` suffix.
    pub fn is_percentage(self) -> bool {
        !matches!(self, Metric::Reads)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Metric::Cpu),
            "mem" => Ok(Metric::Mem),
            "reads" => Ok(Metric::Reads),
            other => Err(format!("unknown metric: {}", other)),
        }
    }
}

/// A metric event payload, e.g. `{"cpu": 12.5, "mem": 3.1, "age": 4.2}`.
///
/// The payload is kept as raw JSON so that a bad value for one metric never
/// prevents reading the others.
#[derive(Debug, Clone, Copy)]
pub struct MetricSample<'a> {
    payload: &'a Value,
}

impl<'a> MetricSample<'a> {
    /// Wrap an event payload.
    pub fn new(payload: &'a Value) -> Self {
        Self { payload }
    }

    /// Raw value for a metric, if present and numeric.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.number(metric.name())
    }

    /// Seconds since the sampled entity was last updated.
    pub fn age(&self) -> Option<f64> {
        self.number("age")
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.payload.get(key)?.as_f64().filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_names_round_trip_through_from_str() {
        for metric in [Metric::Cpu, Metric::Mem, Metric::Reads] {
            assert_eq!(metric.name().parse::<Metric>(), Ok(metric));
        }
        assert!("disk".parse::<Metric>().is_err());
    }

    #[test]
    fn test_only_reads_is_not_a_percentage() {
        assert!(Metric::Cpu.is_percentage());
        assert!(Metric::Mem.is_percentage());
        assert!(!Metric::Reads.is_percentage());
    }

    #[test]
    fn test_sample_skips_missing_and_non_numeric_values() {
        let payload = json!({"cpu": 12.5, "mem": "n/a", "age": 3});
        let sample = MetricSample::new(&payload);

        assert_eq!(sample.value(Metric::Cpu), Some(12.5));
        assert_eq!(sample.value(Metric::Mem), None);
        assert_eq!(sample.value(Metric::Reads), None);
        assert_eq!(sample.age(), Some(3.0));
    }

    #[test]
    fn test_sample_of_non_object_payload_is_empty() {
        let payload = json!([1, 2, 3]);
        let sample = MetricSample::new(&payload);
        assert_eq!(sample.value(Metric::Cpu), None);
        assert_eq!(sample.age(), None);
    }
}

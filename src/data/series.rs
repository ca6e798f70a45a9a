//! Fixed-duration rolling series backing each graph.

use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use super::metric::Metric;

/// One point on a graph: a timestamp and the value of each metric.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Seconds on the graph's time axis.
    pub x: f64,
    /// Chart values keyed by metric. Metrics missing from a sample are absent.
    pub values: BTreeMap<Metric, f64>,
}

/// A sliding window over the most recent `capacity` data points.
///
/// Points are spaced `interval` seconds apart starting from `time_base`.
/// Pushing past capacity evicts the oldest point, so the window always covers
/// a fixed duration.
#[derive(Debug, Clone)]
pub struct RollingSeries {
    capacity: usize,
    interval: f64,
    time_base: f64,
    pushed: u64,
    points: VecDeque<DataPoint>,
}

impl RollingSeries {
    /// Create an empty series anchored at `time_base` (seconds since epoch).
    pub fn new(capacity: usize, interval: f64, time_base: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            interval,
            time_base,
            pushed: 0,
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Create an empty series anchored at the current wall-clock time.
    pub fn starting_now(capacity: usize, interval: f64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self::new(capacity, interval, now)
    }

    /// Append a point at the newest end, evicting the oldest when full.
    pub fn push(&mut self, values: BTreeMap<Metric, f64>) {
        let x = self.time_base + self.pushed as f64 * self.interval;
        self.pushed += 1;
        self.points.push_back(DataPoint { x, values });
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Points ordered oldest to newest.
    pub fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn time_base(&self) -> f64 {
        self.time_base
    }

    /// Total number of points ever pushed.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// `(x, y)` pairs for one metric, oldest first.
    pub fn series(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.values.get(&metric).map(|v| (p.x, *v)))
            .collect()
    }

    /// Most recent value of a metric still in the window.
    pub fn latest(&self, metric: Metric) -> Option<f64> {
        self.points.iter().rev().find_map(|p| p.values.get(&metric).copied())
    }

    /// Largest value of any metric in the window.
    pub fn max_value(&self) -> Option<f64> {
        self.points
            .iter()
            .flat_map(|p| p.values.values().copied())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// X-axis bounds covering a full window from the oldest retained point.
    pub fn x_bounds(&self) -> [f64; 2] {
        let start = self.points.front().map(|p| p.x).unwrap_or(self.time_base);
        let span = (self.capacity.saturating_sub(1)) as f64 * self.interval;
        [start, start + span.max(self.interval)]
    }

    /// Drop every point.
    pub fn clear(&mut self) {
        self.points.clear();
        self.points.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(v: f64) -> BTreeMap<Metric, f64> {
        BTreeMap::from([(Metric::Cpu, v)])
    }

    #[test]
    fn test_series_never_exceeds_capacity() {
        let mut series = RollingSeries::new(3, 10.0, 0.0);
        for i in 0..10 {
            series.push(point(i as f64));
            assert!(series.len() <= 3);
        }
        assert_eq!(series.len(), 3);
        assert_eq!(series.pushed(), 10);
    }

    #[test]
    fn test_eviction_keeps_newest_in_order() {
        let mut series = RollingSeries::new(3, 10.0, 0.0);
        for i in 0..5 {
            series.push(point(i as f64));
        }

        let values: Vec<f64> = series.series(Metric::Cpu).into_iter().map(|(_, y)| y).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);

        let xs: Vec<f64> = series.points().map(|p| p.x).collect();
        assert_eq!(xs, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_points_are_spaced_from_time_base() {
        let mut series = RollingSeries::new(25, 10.0, 1000.0);
        series.push(point(1.0));
        series.push(point(2.0));
        let xs: Vec<f64> = series.points().map(|p| p.x).collect();
        assert_eq!(xs, vec![1000.0, 1010.0]);
        assert_eq!(series.x_bounds(), [1000.0, 1240.0]);
    }

    #[test]
    fn test_latest_and_max() {
        let mut series = RollingSeries::new(5, 1.0, 0.0);
        assert_eq!(series.latest(Metric::Cpu), None);
        assert_eq!(series.max_value(), None);

        series.push(point(5.0));
        series.push(BTreeMap::from([(Metric::Mem, 9.0)]));
        assert_eq!(series.latest(Metric::Cpu), Some(5.0));
        assert_eq!(series.latest(Metric::Mem), Some(9.0));
        assert_eq!(series.max_value(), Some(9.0));
    }

    #[test]
    fn test_zero_capacity_is_treated_as_one() {
        let mut series = RollingSeries::new(0, 1.0, 0.0);
        series.push(point(1.0));
        series.push(point(2.0));
        assert_eq!(series.capacity(), 1);
        assert_eq!(series.latest(Metric::Cpu), Some(2.0));
    }

    #[test]
    fn test_clear_releases_points() {
        let mut series = RollingSeries::new(2, 1.0, 0.0);
        series.push(point(1.0));
        series.clear();
        assert!(series.is_empty());
    }
}

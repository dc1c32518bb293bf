//! The statistics snapshot exposed to conference-orchestration callers: rule
//! counters plus registry-wide bridge counts, rendered as a plain
//! name→value mapping on demand.

use std::collections::HashMap;

/// A single statistic's value. Kept as a tagged union rather than a bare
/// `f64`/`u64` so counters (monotonic) and gauges (point-in-time) are
/// distinguishable to a consumer that exports this snapshot further.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(f64),
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsSnapshot {
    values: HashMap<String, MetricValue>,
}

impl StatisticsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_counter(&mut self, name: impl Into<String>, value: u64) {
        self.values.insert(name.into(), MetricValue::Counter(value));
    }

    pub fn set_gauge(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), MetricValue::Gauge(value));
    }

    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_and_gauge_values_round_trip() {
        let mut snapshot = StatisticsSnapshot::new();
        snapshot.set_counter("total_least_loaded", 4);
        snapshot.set_gauge("bridges_operational", 3.0);

        assert_eq!(snapshot.get("total_least_loaded"), Some(MetricValue::Counter(4)));
        assert_eq!(snapshot.get("bridges_operational"), Some(MetricValue::Gauge(3.0)));
        assert_eq!(snapshot.get("unknown"), None);
    }
}

//! Metric recording as a dependency-injected capability rather than a
//! process-wide static: every component that emits metrics takes a
//! `&dyn MetricSink` instead of reaching for a global.

use std::collections::BTreeMap;
use std::time::SystemTime;

use parking_lot::Mutex;

/// One emitted data point: (timestamp, name, value, tag map).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub timestamp: SystemTime,
    pub name: &'static str,
    pub value: f64,
    pub tags: BTreeMap<String, String>,
}

pub trait MetricSink: Send + Sync {
    fn record(&self, point: MetricPoint);
}

/// Drops every point. Default for production callers that don't want
/// metrics, and the right choice for benchmarks that shouldn't pay for
/// bookkeeping they don't use.
pub struct NoopMetricSink;

impl MetricSink for NoopMetricSink {
    fn record(&self, _point: MetricPoint) {}
}

/// Buffers points in memory, single-producer-multi-consumer in spirit:
/// backpressure-free, drops the oldest entry on overflow rather than
/// blocking the caller. Used by the test harness to assert on emitted
/// metrics.
pub struct InMemoryMetricSink {
    capacity: usize,
    points: Mutex<Vec<MetricPoint>>,
}

impl InMemoryMetricSink {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, points: Mutex::new(Vec::new()) }
    }

    pub fn snapshot(&self) -> Vec<MetricPoint> {
        self.points.lock().clone()
    }
}

impl MetricSink for InMemoryMetricSink {
    fn record(&self, point: MetricPoint) {
        let mut points = self.points.lock();
        if points.len() >= self.capacity {
            points.remove(0);
        }
        points.push(point);
    }
}

pub fn record_duration(sink: &dyn MetricSink, name: &'static str, millis: f64) {
    sink.record(MetricPoint { timestamp: SystemTime::now(), name, value: millis, tags: BTreeMap::new() });
}

pub fn record_gauge(sink: &dyn MetricSink, name: &'static str, value: f64) {
    sink.record(MetricPoint { timestamp: SystemTime::now(), name, value, tags: BTreeMap::new() });
}

/// Metric names emitted by this crate.
pub mod names {
    pub const INFERENCE_DURATION_MS: &str = "speedreader.inference.duration";
    pub const INFERENCE_PARALLELISM: &str = "speedreader.inference.parallelism";
    pub const INFERENCE_MAX_PARALLELISM: &str = "speedreader.inference.max_parallelism";
    pub const INFERENCE_COUNTER: &str = "speedreader.inference.counter";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_drops_oldest_on_overflow() {
        let sink = InMemoryMetricSink::new(2);
        record_gauge(&sink, names::INFERENCE_PARALLELISM, 1.0);
        record_gauge(&sink, names::INFERENCE_PARALLELISM, 2.0);
        record_gauge(&sink, names::INFERENCE_PARALLELISM, 3.0);
        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].value, 2.0);
        assert_eq!(snapshot[1].value, 3.0);
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;

/// Opaque, totally ordered identifier for one inference invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobToken(u64);

/// Summary statistics over a measurement window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub avg_duration: f64,
    pub throughput: f64,
    pub boxed_throughput: f64,
    pub avg_parallelism: f64,
}

impl Summary {
    fn zero() -> Self {
        Self { avg_duration: 0.0, throughput: 0.0, boxed_throughput: 0.0, avg_parallelism: 0.0 }
    }
}

/// Tracks per-call (start, end) timestamp pairs keyed by job token. Uses
/// a `parking_lot::RwLock<Vec<_>>` rather than a lock-free concurrent
/// map; see DESIGN.md for why.
pub struct Sensor {
    next_token: AtomicU64,
    intervals: RwLock<Vec<(JobToken, Instant, Instant)>>,
}

impl Default for Sensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor {
    pub fn new() -> Self {
        Self { next_token: AtomicU64::new(0), intervals: RwLock::new(Vec::new()) }
    }

    pub fn next_token(&self) -> JobToken {
        JobToken(self.next_token.fetch_add(1, Ordering::SeqCst))
    }

    /// Records a completed (start, end) pair for `token`.
    pub fn record(&self, token: JobToken, start: Instant, end: Instant) {
        self.intervals.write().push((token, start, end));
    }

    /// Computes summary statistics over `[window_start, window_end]`.
    pub fn summary(&self, window_start: Instant, window_end: Instant) -> Summary {
        let total_secs = window_end.saturating_duration_since(window_start).as_secs_f64();
        if total_secs <= 0.0 {
            return Summary::zero();
        }

        let intervals = self.intervals.read();

        let enclosed: Vec<(Instant, Instant)> = intervals
            .iter()
            .filter(|(_, s, e)| *s >= window_start && *e <= window_end)
            .map(|(_, s, e)| (*s, *e))
            .collect();

        let avg_duration = if enclosed.is_empty() {
            0.0
        } else {
            enclosed.iter().map(|(s, e)| e.duration_since(*s).as_secs_f64()).sum::<f64>()
                / enclosed.len() as f64
        };

        let end_in_window =
            intervals.iter().filter(|(_, _, e)| *e >= window_start && *e <= window_end).count();
        let throughput = end_in_window as f64 / total_secs;
        let boxed_throughput = enclosed.len() as f64 / total_secs;

        // Sweep line: +1 at each (clipped) start, -1 at each (clipped) end.
        let mut events: Vec<(f64, i32)> = Vec::new();
        for (_, s, e) in intervals.iter() {
            if *e <= window_start || *s >= window_end {
                continue;
            }
            let clipped_start = (*s).max(window_start);
            let clipped_end = (*e).min(window_end);
            events.push((clipped_start.duration_since(window_start).as_secs_f64(), 1));
            events.push((clipped_end.duration_since(window_start).as_secs_f64(), -1));
        }
        events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let mut concurrency = 0i64;
        let mut last_t = 0.0f64;
        let mut weighted_sum = 0.0f64;
        for (t, delta) in events {
            weighted_sum += concurrency as f64 * (t - last_t);
            concurrency += delta as i64;
            last_t = t;
        }
        weighted_sum += concurrency as f64 * (total_secs - last_t);
        let avg_parallelism = weighted_sum / total_secs;

        Summary { avg_duration, throughput, boxed_throughput, avg_parallelism }
    }

    /// Removes pairs entirely earlier than `before`. Callers must not
    /// query intervals whose start <= a previously pruned time.
    pub fn prune(&self, before: Instant) {
        self.intervals.write().retain(|(_, _, e)| *e > before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sequential_jobs_converge_to_expected_statistics() {
        let sensor = Sensor::new();
        let base = Instant::now();
        let d = Duration::from_millis(10);
        let n = 20;
        for i in 0..n {
            let start = base + d * (2 * i);
            let end = start + d;
            let token = sensor.next_token();
            sensor.record(token, start, end);
        }
        let window_end = base + d * (2 * n);
        let summary = sensor.summary(base, window_end);
        assert!((summary.avg_duration - d.as_secs_f64()).abs() < 1e-6);
        assert!((summary.avg_parallelism - 1.0).abs() < 0.1);
    }

    #[test]
    fn k_overlapping_jobs_yield_parallelism_k() {
        let sensor = Sensor::new();
        let base = Instant::now();
        let d = Duration::from_millis(100);
        let k = 4;
        for _ in 0..k {
            let token = sensor.next_token();
            sensor.record(token, base, base + d);
        }
        let summary = sensor.summary(base, base + d);
        assert!((summary.avg_parallelism - k as f64).abs() < 0.05);
    }

    #[test]
    fn prune_removes_pairs_entirely_before_cutoff() {
        let sensor = Sensor::new();
        let base = Instant::now();
        let d = Duration::from_millis(10);
        let token_old = sensor.next_token();
        sensor.record(token_old, base, base + d);
        let token_new = sensor.next_token();
        sensor.record(token_new, base + d * 5, base + d * 6);

        sensor.prune(base + d * 2);
        let summary = sensor.summary(base, base + d * 10);
        assert_eq!(summary.throughput * 10.0 * d.as_secs_f64(), 1.0);
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::controller::sensor::{Sensor, Summary};
use crate::inference::InferenceEngine;
use crate::metrics::{self, MetricSink};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Increase,
    Decrease,
}

/// Gradient-ascent tuner over one managed engine's concurrency ceiling.
/// `tick` implements the decide-and-apply half of the control loop; the
/// wait/resample logic lives in `spawn`, factored apart so tests can
/// drive `tick` directly against synthetic summaries.
pub struct Controller {
    oscillation_threshold: u32,
    action: Option<Action>,
    osc_count: u32,
    last_throughput: f64,
}

impl Controller {
    pub fn new(oscillation_threshold: u32) -> Self {
        Self { oscillation_threshold, action: None, osc_count: 0, last_throughput: 0.0 }
    }

    /// Applies one decision against `summary`, mutating `engine`'s
    /// concurrency ceiling. Returns whether the controller is currently
    /// considered oscillating (`osc_count > oscillation_threshold`).
    pub async fn tick(&mut self, engine: &dyn InferenceEngine, summary: &Summary) -> bool {
        let max_capacity = engine.current_max_capacity() as f64;

        if summary.avg_parallelism < max_capacity - 2.0 {
            engine.decrement_parallelism().await;
            self.osc_count = 0;
            self.action = None;
        } else if self.action.is_none() {
            engine.increment_parallelism().await;
            self.action = Some(Action::Increase);
        } else {
            let dt = if self.last_throughput > 0.0 {
                (summary.boxed_throughput - self.last_throughput) / self.last_throughput
            } else {
                f64::INFINITY
            };
            match self.action.unwrap() {
                Action::Increase => {
                    if dt > 0.05 {
                        engine.increment_parallelism().await;
                    } else {
                        engine.decrement_parallelism().await;
                        self.action = Some(Action::Decrease);
                        self.osc_count += 1;
                    }
                }
                Action::Decrease => {
                    if dt > 0.05 {
                        engine.decrement_parallelism().await;
                    } else {
                        engine.increment_parallelism().await;
                        self.action = Some(Action::Increase);
                        self.osc_count += 1;
                    }
                }
            }
        }

        self.last_throughput = summary.boxed_throughput;
        let is_oscillating = self.osc_count > self.oscillation_threshold;
        tracing::debug!(
            capacity = engine.current_max_capacity(),
            osc_count = self.osc_count,
            is_oscillating,
            "controller tick"
        );
        is_oscillating
    }
}

/// Spawns the controller loop as a background task for `engine`, sampling
/// `sensor` until `now >= t0 + 8 * avg_duration` (or polling every 20ms
/// while avg_duration is still zero), resampling each time, then calling
/// `tick`.
pub fn spawn(
    engine: Arc<dyn InferenceEngine>,
    sensor: Arc<Sensor>,
    oscillation_threshold: u32,
    metric_sink: Arc<dyn MetricSink>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut controller = Controller::new(oscillation_threshold);
        loop {
            let t0 = Instant::now();
            let mut s = sensor.summary(t0, Instant::now());
            loop {
                let now = Instant::now();
                let wait = if s.avg_duration > 0.0 {
                    Duration::from_secs_f64(8.0 * s.avg_duration)
                } else {
                    Duration::from_millis(20)
                };
                if now >= t0 + wait {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                s = sensor.summary(t0, Instant::now());
            }

            let is_oscillating = controller.tick(engine.as_ref(), &s).await;
            if is_oscillating {
                tracing::warn!("adaptive controller is oscillating");
            }
            metrics::record_gauge(metric_sink.as_ref(), metrics::names::INFERENCE_PARALLELISM, s.avg_parallelism);
            metrics::record_gauge(
                metric_sink.as_ref(),
                metrics::names::INFERENCE_MAX_PARALLELISM,
                engine.current_max_capacity() as f64,
            );

            let now = Instant::now();
            sensor.prune(now);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::null::NullInferenceEngine;

    fn summary_with(avg_parallelism: f64, boxed_throughput: f64) -> Summary {
        Summary { avg_duration: 0.0, throughput: 0.0, boxed_throughput, avg_parallelism }
    }

    #[tokio::test]
    async fn first_observation_increases_capacity() {
        let engine = NullInferenceEngine::new(None, vec![1]);
        let mut controller = Controller::new(2);
        let summary = summary_with(1.0, 100.0);
        controller.tick(&engine, &summary).await;
        assert_eq!(engine.current_max_capacity(), 2);
    }

    #[tokio::test]
    async fn slack_detected_decrements_and_resets_action() {
        let engine = NullInferenceEngine::new(None, vec![1]);
        // Bump capacity up first so there's room to decrement.
        engine.increment_parallelism().await;
        engine.increment_parallelism().await;
        engine.increment_parallelism().await;
        assert_eq!(engine.current_max_capacity(), 4);

        let mut controller = Controller::new(2);
        let summary = summary_with(1.0, 50.0); // avg_parallelism 1 << capacity-2=2
        controller.tick(&engine, &summary).await;
        assert_eq!(engine.current_max_capacity(), 3);
    }

    #[tokio::test]
    async fn repeated_reversals_trip_oscillating_flag() {
        let engine = NullInferenceEngine::new(None, vec![1]);
        for _ in 0..5 {
            engine.increment_parallelism().await;
        }
        let mut controller = Controller::new(1);
        let mut oscillating = false;
        // Alternate throughput improving then flat to force INCREASE/DECREASE flips.
        for i in 0..8 {
            let boxed = if i % 2 == 0 { 400.0 } else { 390.0 };
            let summary = summary_with(engine.current_max_capacity() as f64, boxed);
            oscillating = controller.tick(&engine, &summary).await || oscillating;
        }
        assert!(oscillating);
    }
}

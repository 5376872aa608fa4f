//! Pipeline orchestrator (C7): composes the detector and recognizer with
//! bounded queues, backpressure, and in-order result delivery.
//!
//! The four stage tasks (`det_pre`, `det_post`, `rec_pre`, `rec_post`) are
//! spawned once, for the life of the `Pipeline`, and communicate through
//! four bounded `mpsc` channels sized `ceil((p_det + p_rec) * 1.5)`.
//! Each job carries its own `oneshot` result sender from
//! submission through every stage, so `read_one` and `read_many` are both
//! thin front-ends over the same shared stage graph rather than two
//! separate execution paths.
//!
//! Cancellation falls out of the channel graph for free: if a
//! `read_many` consumer drops its output stream, the stage that would
//! have delivered to it fails its next send, exits, and drops its own
//! receiver — which fails the stage feeding *it*, and so on back to
//! `submit`. No separate cancellation flag is threaded through every
//! stage; channel closure *is* the cancellation signal.

mod job;
mod stages;
mod viz;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use image::RgbImage;
use tokio::sync::{mpsc, oneshot};

use crate::controller::Sensor;
use crate::detector::Detector;
use crate::error::{Result, SpeedReaderError};
use crate::metrics::{MetricSink, NoopMetricSink};
use crate::recognizer::Recognizer;
use crate::result::OcrResult;

pub use job::Envelope;
pub use viz::{NoopVisualizationBuilder, VisualizationBuilder};

const STAGE_CHANNEL_MULTIPLIER: f64 = 1.5;

fn queue_capacity(p_det: usize, p_rec: usize) -> usize {
    (((p_det + p_rec) as f64) * STAGE_CHANNEL_MULTIPLIER).ceil().max(1.0) as usize
}

/// Shared orchestrator state: the stage tasks' inbound senders, a faulted
/// flag for fail-fast behavior after a fatal internal error, and a
/// monotonic sequence counter for submission ordering.
pub struct Pipeline {
    det_pre_tx: mpsc::Sender<job::SubmittedJob>,
    faulted: Arc<AtomicBool>,
    next_seq: AtomicU64,
    queue_capacity: usize,
    _det_pre_task: tokio::task::JoinHandle<()>,
    _det_post_task: tokio::task::JoinHandle<()>,
    _rec_pre_task: tokio::task::JoinHandle<()>,
    _rec_post_task: tokio::task::JoinHandle<()>,
    _det_controller_task: Option<tokio::task::JoinHandle<()>>,
    _rec_controller_task: Option<tokio::task::JoinHandle<()>>,
}

impl Pipeline {
    /// Builds a pipeline with adaptive controllers disabled (fixed
    /// concurrency) and no metric sink. Most tests want this; production
    /// callers should use [`Pipeline::with_adaptive_controllers`].
    pub fn new(detector: Arc<Detector>, recognizer: Arc<Recognizer>) -> Self {
        Self::build(detector, recognizer, Arc::new(NoopMetricSink), None)
    }

    pub fn with_metrics(detector: Arc<Detector>, recognizer: Arc<Recognizer>, metric_sink: Arc<dyn MetricSink>) -> Self {
        Self::build(detector, recognizer, metric_sink, None)
    }

    /// Spawns one adaptive controller task per managed engine, tuning
    /// `detector`'s and `recognizer`'s concurrency ceilings online
    /// against the same sensors the stage tasks record into.
    pub fn with_adaptive_controllers(
        detector: Arc<Detector>,
        recognizer: Arc<Recognizer>,
        metric_sink: Arc<dyn MetricSink>,
        oscillation_threshold: u32,
    ) -> Self {
        Self::build(detector, recognizer, metric_sink, Some(oscillation_threshold))
    }

    fn build(
        detector: Arc<Detector>,
        recognizer: Arc<Recognizer>,
        metric_sink: Arc<dyn MetricSink>,
        oscillation_threshold: Option<u32>,
    ) -> Self {
        let capacity = queue_capacity(detector.current_max_capacity(), recognizer.current_max_capacity());

        let (det_pre_tx, det_pre_rx) = mpsc::channel(capacity);
        let (det_post_tx, det_post_rx) = mpsc::channel(capacity);
        let (rec_pre_tx, rec_pre_rx) = mpsc::channel(capacity);
        let (rec_post_tx, rec_post_rx) = mpsc::channel(capacity);

        let det_sensor = Arc::new(Sensor::new());
        let rec_sensor = Arc::new(Sensor::new());

        let det_pre_task = stages::spawn_det_pre(Arc::clone(&detector), det_pre_rx, det_post_tx);
        let det_post_task = stages::spawn_det_post(
            Arc::clone(&detector),
            Arc::clone(&det_sensor),
            Arc::clone(&metric_sink),
            det_post_rx,
            rec_pre_tx,
        );
        let rec_pre_task = stages::spawn_rec_pre(Arc::clone(&recognizer), rec_pre_rx, rec_post_tx);
        let rec_post_task = stages::spawn_rec_post(
            Arc::clone(&recognizer),
            Arc::clone(&rec_sensor),
            Arc::clone(&metric_sink),
            rec_post_rx,
        );

        let (det_controller_task, rec_controller_task) = match oscillation_threshold {
            Some(threshold) => (
                Some(crate::controller::tuner::spawn(
                    detector.engine(),
                    det_sensor,
                    threshold,
                    Arc::clone(&metric_sink),
                )),
                Some(crate::controller::tuner::spawn(recognizer.engine(), rec_sensor, threshold, metric_sink)),
            ),
            None => (None, None),
        };

        Self {
            det_pre_tx,
            faulted: Arc::new(AtomicBool::new(false)),
            next_seq: AtomicU64::new(0),
            queue_capacity: capacity,
            _det_pre_task: det_pre_task,
            _det_post_task: det_post_task,
            _rec_pre_task: rec_pre_task,
            _rec_post_task: rec_post_task,
            _det_controller_task: det_controller_task,
            _rec_controller_task: rec_controller_task,
        }
    }

    /// Submits one image with an explicit visualization handle, returning
    /// the job's sequence number and a receiver that resolves once every
    /// stage has run. Suspends if the first stage's queue is full.
    async fn submit(
        &self,
        image: RgbImage,
        viz: Arc<dyn VisualizationBuilder>,
    ) -> Result<(u64, oneshot::Receiver<std::result::Result<Vec<OcrResult>, SpeedReaderError>>)> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(SpeedReaderError::PipelineFaulted("pipeline faulted".into()));
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let (result_tx, result_rx) = oneshot::channel();
        let envelope = job::Envelope { seq, viz, result_tx, payload: Ok(Arc::new(image)) };

        if self.det_pre_tx.send(envelope).await.is_err() {
            self.faulted.store(true, Ordering::SeqCst);
            return Err(SpeedReaderError::PipelineFaulted("stage graph shut down".into()));
        }
        Ok((seq, result_rx))
    }

    /// Submits one image and awaits its result in isolation.
    pub async fn read_one(&self, image: RgbImage) -> Result<Vec<OcrResult>> {
        let (_, rx) = self.submit(image, Arc::new(NoopVisualizationBuilder)).await?;
        rx.await.unwrap_or_else(|_| Err(SpeedReaderError::PipelineFaulted("result sender dropped".into())))
    }

    /// Pulls images from `images` at the rate the pipeline can accept
    /// them, yielding `(sequence, result)` pairs in submission order.
    /// Dropping the returned stream before exhaustion cancels in-flight
    /// work for images not yet delivered (see module docs).
    pub fn read_many<S>(self: &Arc<Self>, images: S) -> impl Stream<Item = (u64, Result<Vec<OcrResult>>)>
    where
        S: Stream<Item = RgbImage> + Send + 'static,
    {
        let pipeline = Arc::clone(self);
        let concurrency = self.queue_capacity;

        images
            .then(move |image| {
                let pipeline = Arc::clone(&pipeline);
                async move { pipeline.submit(image, Arc::new(NoopVisualizationBuilder)).await }
            })
            .map(|submission| async move {
                match submission {
                    Ok((seq, rx)) => {
                        let result = rx.await.unwrap_or_else(|_| {
                            Err(SpeedReaderError::PipelineFaulted("result sender dropped".into()))
                        });
                        (seq, result)
                    }
                    Err(e) => {
                        // Submission itself failed (pipeline faulted); there is
                        // no sequence number to report, so this job is simply
                        // lost from the ordered stream rather than misnumbered.
                        (u64::MAX, Err(e))
                    }
                }
            })
            .buffered(concurrency.max(1))
    }
}

impl Drop for Pipeline {
    /// The four stage tasks terminate on their own once `det_pre_tx`
    /// drops and the channel-closure cascade described in the module docs
    /// runs to completion, so letting already-queued jobs finish is the
    /// graceful default. The two controller tasks have no such exit
    /// condition (they loop on a timer independent of the job graph), so
    /// they're aborted explicitly here.
    fn drop(&mut self) {
        if let Some(task) = &self._det_controller_task {
            task.abort();
        }
        if let Some(task) = &self._rec_controller_task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    use crate::config::{DetectorConfig, RecognizerConfig};
    use crate::detector::Detector;
    use crate::inference::{InferenceEngine, NullInferenceEngine, TensorBuffer};
    use crate::recognizer::{CharacterDictionary, Recognizer};

    fn null_detector(config: DetectorConfig) -> Arc<Detector> {
        let tiling = crate::detector::tile::tile(640, 640, &config);
        let t = &tiling.tiles[0];
        let shape = vec![tiling.tiles.len(), 1, t.model_height as usize, t.model_width as usize];
        let engine = Arc::new(NullInferenceEngine::new(None, shape));
        Arc::new(Detector::new(engine, config))
    }

    fn null_recognizer(config: RecognizerConfig) -> Arc<Recognizer> {
        // a null recognizer output is zero-filled, which argmaxes to blank
        // everywhere regardless of declared shape, so any shape works here.
        let engine = Arc::new(NullInferenceEngine::new(None, vec![1, 1, 8]));
        let dict = Arc::new(CharacterDictionary::from_lines(vec!["a".into()]));
        Arc::new(Recognizer::new(engine, config, dict))
    }

    #[tokio::test]
    async fn read_one_against_null_engines_yields_no_detections() {
        let detector = null_detector(DetectorConfig::default());
        let recognizer = null_recognizer(RecognizerConfig::default());
        let pipeline = Pipeline::new(detector, recognizer);

        let image = RgbImage::new(640, 640);
        let result = pipeline.read_one(image).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn read_many_preserves_submission_order() {
        let detector = null_detector(DetectorConfig::default());
        let recognizer = null_recognizer(RecognizerConfig::default());
        let pipeline = Arc::new(Pipeline::new(detector, recognizer));

        let images = (0..5u8).map(|i| RgbImage::from_pixel(640, 640, image::Rgb([i, i, i])));
        let stream = futures::stream::iter(images);

        let results: Vec<(u64, Result<Vec<OcrResult>>)> = pipeline.read_many(stream).collect().await;
        let seqs: Vec<u64> = results.iter().map(|(seq, _)| *seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
        for (_, result) in results {
            assert!(result.unwrap().is_empty());
        }
    }

    /// A detector-side kernel that suspends every call until `open_all` is
    /// called, so tests can hold jobs in flight and observe backpressure
    /// before releasing them all at once. Uses the
    /// pre-registration pattern from `Notify`'s docs (create the
    /// `Notified` future before re-checking the flag) so a call racing
    /// `open_all` can never miss the wakeup and hang forever.
    struct Gate {
        open: std::sync::atomic::AtomicBool,
        notify: Notify,
    }

    impl Gate {
        fn new() -> Self {
            Self { open: std::sync::atomic::AtomicBool::new(false), notify: Notify::new() }
        }

        async fn wait(&self) {
            if self.open.load(Ordering::SeqCst) {
                return;
            }
            let notified = self.notify.notified();
            if self.open.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }

        fn open_all(&self) {
            self.open.store(true, Ordering::SeqCst);
            self.notify.notify_waiters();
        }
    }

    struct GatedEngine {
        gate: Arc<Gate>,
        capacity: AtomicUsize,
        output_shape: Vec<usize>,
    }

    impl GatedEngine {
        fn new(gate: Arc<Gate>, capacity: usize, output_shape: Vec<usize>) -> Self {
            Self { gate, capacity: AtomicUsize::new(capacity), output_shape }
        }
    }

    #[async_trait]
    impl InferenceEngine for GatedEngine {
        async fn run(&self, _input: TensorBuffer) -> Result<TensorBuffer> {
            self.gate.wait().await;
            let count: usize = self.output_shape.iter().product();
            Ok(TensorBuffer::new(vec![0.0; count], self.output_shape.clone()))
        }

        fn current_max_capacity(&self) -> usize {
            self.capacity.load(Ordering::SeqCst)
        }

        async fn increment_parallelism(&self) {
            self.capacity.fetch_add(1, Ordering::SeqCst);
        }

        async fn decrement_parallelism(&self) {
            self.capacity.fetch_sub(1, Ordering::SeqCst);
        }

        fn dispose(&self) {}
    }

    #[tokio::test]
    async fn submissions_beyond_queue_capacity_suspend_until_gate_releases() {
        let det_config = DetectorConfig::default();
        let tiling = crate::detector::tile::tile(640, 640, &det_config);
        let t = &tiling.tiles[0];
        let det_output_shape = vec![tiling.tiles.len(), 1, t.model_height as usize, t.model_width as usize];

        let gate = Arc::new(Gate::new());
        let det_engine = Arc::new(GatedEngine::new(Arc::clone(&gate), 2, det_output_shape));
        let detector = Arc::new(Detector::new(det_engine, det_config));
        let recognizer = null_recognizer(RecognizerConfig::default());
        // capacity = ceil((2 + recognizer.current_max_capacity()) * 1.5); recognizer's
        // NullInferenceEngine starts at capacity 1, giving ceil(3 * 1.5) = 5.
        let pipeline = Arc::new(Pipeline::new(detector, recognizer));
        let capacity = pipeline.queue_capacity;

        let mut handles = Vec::new();
        for _ in 0..capacity + 2 {
            let pipeline = Arc::clone(&pipeline);
            let image = RgbImage::new(640, 640);
            handles.push(tokio::spawn(async move { pipeline.read_one(image).await }));
        }

        // give every submission a chance to either complete or block.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(handles.iter().all(|h| !h.is_finished()), "no job should complete before the gate opens");

        gate.open_all();
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert!(result.is_empty());
        }
    }
}

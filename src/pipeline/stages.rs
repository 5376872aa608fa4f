use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use ndarray::Array4;
use tokio::sync::mpsc;

use crate::controller::Sensor;
use crate::detector::Detector;
use crate::error::SpeedReaderError;
use crate::geometry::BoundingBox;
use crate::metrics::{self, MetricSink};
use crate::recognizer::{Recognizer, RecognizerBatch};
use crate::result::{BoundingBoxJson, OcrResult};

use super::job::Envelope;

pub struct DetPreOut {
    pub image: Arc<RgbImage>,
    pub tiling: crate::detector::Tiling,
    pub batch: Array4<f32>,
}

pub struct DetPostOut {
    pub image: Arc<RgbImage>,
    pub boxes: Vec<BoundingBox>,
}

pub struct RecPreOut {
    pub boxes: Vec<BoundingBox>,
    pub batch: RecognizerBatch,
}

/// Stage: tile + preprocess. Runs on a blocking-pool thread since image
/// and geometry kernels are pure, non-suspending CPU work, so they
/// shouldn't tie up an async worker. Jobs are received and dispatched in
/// arrival order.
pub fn spawn_det_pre(
    detector: Arc<Detector>,
    mut rx: mpsc::Receiver<Envelope<Arc<RgbImage>>>,
    tx: mpsc::Sender<Envelope<DetPreOut>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(env) = rx.recv().await {
            let seq = env.seq;
            let next = match env.payload {
                Ok(image) => {
                    let detector = Arc::clone(&detector);
                    let image_for_work = Arc::clone(&image);
                    let outcome = tokio::task::spawn_blocking(move || {
                        if image_for_work.width() == 0 || image_for_work.height() == 0 {
                            return Err(SpeedReaderError::invalid_input("zero-sized image"));
                        }
                        let tiling = detector.tile(&image_for_work);
                        let batch = detector.preprocess(&image_for_work, &tiling);
                        Ok((tiling, batch))
                    })
                    .await;
                    match outcome {
                        Ok(Ok((tiling, batch))) => Ok(DetPreOut { image, tiling, batch }),
                        Ok(Err(e)) => Err(e),
                        Err(join_err) => Err(SpeedReaderError::InvalidInput(join_err.to_string())),
                    }
                }
                Err(e) => Err(e),
            };
            let out = Envelope { seq, viz: env.viz, result_tx: env.result_tx, payload: next };
            if tx.send(out).await.is_err() {
                tracing::debug!(seq, "det_pre: downstream closed, stopping");
                break;
            }
        }
    })
}

/// Stage: detector inference + postprocess. Jobs are pulled off the queue
/// in arrival order and each spawns its own task immediately; concurrency
/// is gated inside `detector.run_inference` by the engine's own capacity
/// semaphore (see `RealInferenceEngine`), not by this stage, so a call
/// stalls there precisely when `detector.current_max_capacity()` calls
/// are already in flight — including capacity the adaptive controller
/// (C6) raises or lowers after the pipeline is built. Upstream
/// backpressure instead comes from the bounded channel this stage reads
/// from. Each call's duration is recorded into the detector's sensor.
pub fn spawn_det_post(
    detector: Arc<Detector>,
    sensor: Arc<Sensor>,
    metric_sink: Arc<dyn MetricSink>,
    mut rx: mpsc::Receiver<Envelope<DetPreOut>>,
    tx: mpsc::Sender<Envelope<DetPostOut>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let counter = Arc::new(AtomicU64::new(0));
        while let Some(env) = rx.recv().await {
            let seq = env.seq;
            let detector = Arc::clone(&detector);
            let sensor = Arc::clone(&sensor);
            let metric_sink = Arc::clone(&metric_sink);
            let counter = Arc::clone(&counter);
            let tx = tx.clone();

            tokio::spawn(async move {
                let next = match env.payload {
                    Ok(pre) => {
                        let token = sensor.next_token();
                        let start = Instant::now();
                        let result = detector.run_inference(&pre.batch).await;
                        let end = Instant::now();
                        sensor.record(token, start, end);
                        metrics::record_duration(
                            metric_sink.as_ref(),
                            metrics::names::INFERENCE_DURATION_MS,
                            end.duration_since(start).as_secs_f64() * 1000.0,
                        );
                        let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
                        metrics::record_gauge(metric_sink.as_ref(), metrics::names::INFERENCE_COUNTER, count as f64);
                        match result {
                            Ok(probability_batch) => {
                                let boxes = detector.postprocess(&probability_batch, &pre.tiling);
                                env.viz.add_boxes(&boxes);
                                Ok(DetPostOut { image: pre.image, boxes })
                            }
                            Err(e) => Err(e),
                        }
                    }
                    Err(e) => Err(e),
                };
                let out = Envelope { seq, viz: env.viz, result_tx: env.result_tx, payload: next };
                if tx.send(out).await.is_err() {
                    tracing::debug!(seq, "det_post: downstream closed, stopping");
                }
            });
        }
    })
}

/// Stage: oriented crop + recognizer batching. Blocking-pool work, same
/// rationale as `spawn_det_pre`.
pub fn spawn_rec_pre(
    recognizer: Arc<Recognizer>,
    mut rx: mpsc::Receiver<Envelope<DetPostOut>>,
    tx: mpsc::Sender<Envelope<RecPreOut>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(env) = rx.recv().await {
            let seq = env.seq;
            let next = match env.payload {
                Ok(post) => {
                    let recognizer = Arc::clone(&recognizer);
                    let boxes = post.boxes;
                    let image = post.image;
                    let boxes_for_work = boxes.clone();
                    let outcome = tokio::task::spawn_blocking(move || recognizer.preprocess(&image, &boxes_for_work))
                        .await;
                    match outcome {
                        Ok(batch) => Ok(RecPreOut { boxes, batch }),
                        Err(join_err) => Err(SpeedReaderError::InvalidInput(join_err.to_string())),
                    }
                }
                Err(e) => Err(e),
            };
            let out = Envelope { seq, viz: env.viz, result_tx: env.result_tx, payload: next };
            if tx.send(out).await.is_err() {
                tracing::debug!(seq, "rec_pre: downstream closed, stopping");
                break;
            }
        }
    })
}

/// Final stage: recognizer inference + CTC decode, then emits the job's
/// result on its own awaiter. Skips inference for an empty box list.
/// Concurrency is gated the same way as `spawn_det_post`: inside
/// `recognizer.run_inference`, by the engine's own capacity semaphore.
pub fn spawn_rec_post(
    recognizer: Arc<Recognizer>,
    sensor: Arc<Sensor>,
    metric_sink: Arc<dyn MetricSink>,
    mut rx: mpsc::Receiver<Envelope<RecPreOut>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let counter = Arc::new(AtomicU64::new(0));
        while let Some(env) = rx.recv().await {
            let seq = env.seq;
            let recognizer = Arc::clone(&recognizer);
            let sensor = Arc::clone(&sensor);
            let metric_sink = Arc::clone(&metric_sink);
            let counter = Arc::clone(&counter);

            tokio::spawn(async move {
                let outcome: Result<Vec<OcrResult>, SpeedReaderError> = match env.payload {
                    Ok(pre) => {
                        if pre.boxes.is_empty() {
                            Ok(Vec::new())
                        } else {
                            let token = sensor.next_token();
                            let start = Instant::now();
                            let result = recognizer.run_inference(&pre.batch.tensor).await;
                            let end = Instant::now();
                            sensor.record(token, start, end);
                            metrics::record_duration(
                                metric_sink.as_ref(),
                                metrics::names::INFERENCE_DURATION_MS,
                                end.duration_since(start).as_secs_f64() * 1000.0,
                            );
                            let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
                            metrics::record_gauge(
                                metric_sink.as_ref(),
                                metrics::names::INFERENCE_COUNTER,
                                count as f64,
                            );
                            result.map(|logits| {
                                let recognitions = recognizer.postprocess(&logits);
                                pre.boxes
                                    .iter()
                                    .zip(recognitions)
                                    .map(|(bbox, rec)| OcrResult {
                                        text: rec.text,
                                        confidence: rec.confidence,
                                        bounding_box: BoundingBoxJson::from(bbox),
                                    })
                                    .collect()
                            })
                        }
                    }
                    Err(e) => Err(e),
                };
                if env.result_tx.send(outcome).is_err() {
                    tracing::debug!(seq, "rec_post: awaiter dropped before result was delivered");
                }
            });
        }
    })
}

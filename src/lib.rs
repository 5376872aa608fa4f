//! # speedreader
//!
//! On-device OCR engine: DBNet-class text detection and SVTRv2-class CTC
//! recognition behind an adaptively-concurrent pipeline over an
//! ONNX-compatible inference runtime.
//!
//! The crate is organized around the detector (`detector`) and recognizer
//! (`recognizer`) processing contracts, a shared inference façade
//! (`inference`) three kernels implement, an adaptive parallelism
//! controller (`controller`), and a pipeline orchestrator (`pipeline`)
//! that composes all of the above into a bounded, backpressured,
//! in-order request/response API. [`SpeedReader`] is the top-level
//! convenience entry point; each module is also usable on its own for
//! callers who want to drive detection/recognition directly.

pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod image_ops;
pub mod inference;
pub mod metrics;
pub mod pipeline;
pub mod recognizer;
pub mod result;

use std::sync::Arc;

use futures::stream::Stream;
use image::RgbImage;

use config::SpeedReaderConfig;
use detector::Detector;
use error::Result;
use inference::{InferenceEngine, RealInferenceEngine};
use metrics::{MetricSink, NoopMetricSink};
use pipeline::Pipeline;
use recognizer::{CharacterDictionary, Recognizer};
use result::OcrResult;

pub use config::{ControllerConfig, DetectorConfig, RecognizerConfig};
pub use error::SpeedReaderError;

/// Top-level facade: owns a detector, a recognizer, and the pipeline
/// wiring them together. Loads both sessions from in-memory bytes (no
/// filesystem access required) as a consuming constructor.
pub struct SpeedReader {
    pipeline: Arc<Pipeline>,
}

impl SpeedReader {
    /// Loads both ONNX models from memory and wires a pipeline with
    /// adaptive concurrency controllers enabled, using
    /// `RealInferenceEngine::default_thread_count()` worker threads for
    /// each engine's initial concurrency ceiling.
    pub fn from_model_bytes(
        detector_model: &[u8],
        recognizer_model: &[u8],
        dictionary: CharacterDictionary,
        config: SpeedReaderConfig,
    ) -> Result<Self> {
        let num_threads = RealInferenceEngine::default_thread_count();
        let det_engine: Arc<dyn InferenceEngine> =
            Arc::new(RealInferenceEngine::from_bytes(detector_model, num_threads)?);
        let rec_engine: Arc<dyn InferenceEngine> =
            Arc::new(RealInferenceEngine::from_bytes(recognizer_model, num_threads)?);

        Ok(Self::with_engines(det_engine, rec_engine, dictionary, config, Arc::new(NoopMetricSink)))
    }

    /// Loads both ONNX models from memory and reports metrics through
    /// `metric_sink` instead of the no-op default.
    pub fn from_model_bytes_with_metrics(
        detector_model: &[u8],
        recognizer_model: &[u8],
        dictionary: CharacterDictionary,
        config: SpeedReaderConfig,
        metric_sink: Arc<dyn MetricSink>,
    ) -> Result<Self> {
        let num_threads = RealInferenceEngine::default_thread_count();
        let det_engine: Arc<dyn InferenceEngine> =
            Arc::new(RealInferenceEngine::from_bytes(detector_model, num_threads)?);
        let rec_engine: Arc<dyn InferenceEngine> =
            Arc::new(RealInferenceEngine::from_bytes(recognizer_model, num_threads)?);

        Ok(Self::with_engines(det_engine, rec_engine, dictionary, config, metric_sink))
    }

    /// Builds a pipeline over caller-supplied inference engines, e.g. a
    /// `NullInferenceEngine` or `CachedInferenceEngine` in tests, or a
    /// `RealInferenceEngine` built some other way than from raw bytes.
    pub fn with_engines(
        detector_engine: Arc<dyn InferenceEngine>,
        recognizer_engine: Arc<dyn InferenceEngine>,
        dictionary: CharacterDictionary,
        config: SpeedReaderConfig,
        metric_sink: Arc<dyn MetricSink>,
    ) -> Self {
        let detector = Arc::new(Detector::new(detector_engine, config.detector));
        let recognizer = Arc::new(Recognizer::new(recognizer_engine, config.recognizer, Arc::new(dictionary)));
        let pipeline = Arc::new(Pipeline::with_adaptive_controllers(
            detector,
            recognizer,
            metric_sink,
            config.controller.oscillation_threshold,
        ));
        Self { pipeline }
    }

    /// Runs the full detect + recognize chain over one image.
    pub async fn read_one(&self, image: RgbImage) -> Result<Vec<OcrResult>> {
        self.pipeline.read_one(image).await
    }

    /// Runs the full chain over a stream of images, yielding
    /// `(sequence, result)` pairs in submission order while keeping up to
    /// the pipeline's queue capacity in flight at once.
    pub fn read_many<S>(&self, images: S) -> impl Stream<Item = (u64, Result<Vec<OcrResult>>)>
    where
        S: Stream<Item = RgbImage> + Send + 'static,
    {
        self.pipeline.read_many(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference::NullInferenceEngine;

    #[tokio::test]
    async fn with_engines_runs_end_to_end_against_null_kernels() {
        let config = SpeedReaderConfig::default();
        let tiling = detector::tile::tile(640, 640, &config.detector);
        let t = &tiling.tiles[0];
        let det_shape = vec![tiling.tiles.len(), 1, t.model_height as usize, t.model_width as usize];

        let det_engine: Arc<dyn InferenceEngine> = Arc::new(NullInferenceEngine::new(None, det_shape));
        let rec_engine: Arc<dyn InferenceEngine> = Arc::new(NullInferenceEngine::new(None, vec![1, 1, 8]));
        let dictionary = CharacterDictionary::from_lines(vec!["a".into()]);

        let reader = SpeedReader::with_engines(det_engine, rec_engine, dictionary, config, Arc::new(NoopMetricSink));

        let image = RgbImage::new(640, 640);
        let result = reader.read_one(image).await.unwrap();
        assert!(result.is_empty());
    }
}

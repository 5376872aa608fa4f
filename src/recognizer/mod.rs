//! Recognizer (C4): oriented-crop, aspect-preserving resize, batching, and
//! CTC greedy decode of the SVTRv2-class sequence model's logits.

pub mod dictionary;
pub mod postprocess;
pub mod preprocess;

use std::sync::Arc;

use image::RgbImage;
use ndarray::Array3;

use crate::config::RecognizerConfig;
use crate::error::{Result, SpeedReaderError};
use crate::geometry::BoundingBox;
use crate::inference::{InferenceEngine, TensorBuffer};

pub use dictionary::CharacterDictionary;
pub use postprocess::Recognition;
pub use preprocess::RecognizerBatch;

/// Owns the recognizer's inference engine, config, and character
/// dictionary; exposes the `preprocess`/`run_inference`/`postprocess`
/// contract plus a convenience `recognize` that chains all three, as the
/// pipeline orchestrator (C7) uses it.
pub struct Recognizer {
    engine: Arc<dyn InferenceEngine>,
    config: RecognizerConfig,
    dictionary: Arc<CharacterDictionary>,
}

impl Recognizer {
    pub fn new(engine: Arc<dyn InferenceEngine>, config: RecognizerConfig, dictionary: Arc<CharacterDictionary>) -> Self {
        Self { engine, config, dictionary }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn current_max_capacity(&self) -> usize {
        self.engine.current_max_capacity()
    }

    /// Clones the handle to the underlying inference engine, e.g. so an
    /// adaptive controller (C6) can manage its concurrency ceiling.
    pub fn engine(&self) -> Arc<dyn InferenceEngine> {
        Arc::clone(&self.engine)
    }

    pub fn preprocess(&self, image: &RgbImage, boxes: &[BoundingBox]) -> RecognizerBatch {
        preprocess::preprocess(image, boxes, &self.config)
    }

    /// Runs inference over a prepared batch, retrying once with a fresh
    /// (cloned) buffer on `InferenceFailure` before surfacing it.
    pub async fn run_inference(&self, batch: &ndarray::Array4<f32>) -> Result<Array3<f32>> {
        let shape = batch.shape().to_vec();
        let data: Vec<f32> = batch.iter().copied().collect();
        let input = TensorBuffer::new(data, shape);

        let output = match self.engine.run(input.clone()).await {
            Ok(out) => out,
            Err(SpeedReaderError::InferenceFailure(msg)) => {
                tracing::warn!(error = %msg, "recognizer inference failed, retrying once");
                self.engine.run(input).await?
            }
            Err(e) => return Err(e),
        };

        if output.shape.len() != 3 {
            return Err(SpeedReaderError::InferenceFailure(format!(
                "expected rank-3 recognizer output, got shape {:?}",
                output.shape
            )));
        }
        let (n, t, v) = (output.shape[0], output.shape[1], output.shape[2]);
        Array3::from_shape_vec((n, t, v), output.data)
            .map_err(|e| SpeedReaderError::InferenceFailure(e.to_string()))
    }

    pub fn postprocess(&self, logits: &Array3<f32>) -> Vec<Recognition> {
        postprocess::postprocess(logits, &self.dictionary)
    }

    /// Full pipeline: preprocess -> inference -> postprocess. Skips
    /// inference entirely for an empty box list (no text regions were
    /// detected), returning an empty result rather than a degenerate
    /// zero-width tensor.
    pub async fn recognize(&self, image: &RgbImage, boxes: &[BoundingBox]) -> Result<Vec<Recognition>> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }
        let batch = self.preprocess(image, boxes);
        let logits = self.run_inference(&batch.tensor).await?;
        Ok(self.postprocess(&logits))
    }
}

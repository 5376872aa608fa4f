//! Detector (C3): tiling, batching, and pre/post-processing around the
//! DBNet-class segmentation model.

pub mod postprocess;
pub mod preprocess;
pub mod tile;

use std::sync::Arc;

use image::RgbImage;
use ndarray::Array4;

use crate::config::DetectorConfig;
use crate::error::{Result, SpeedReaderError};
use crate::geometry::BoundingBox;
use crate::inference::{InferenceEngine, TensorBuffer};

pub use tile::{Tile, Tiling};

/// Owns the detector's inference engine and config; exposes the
/// `tile`/`preprocess`/`run_inference`/`postprocess` contract plus a
/// convenience `detect` that chains all four.
pub struct Detector {
    engine: Arc<dyn InferenceEngine>,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(engine: Arc<dyn InferenceEngine>, config: DetectorConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &DetectorConfig {
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

    pub fn tile(&self, image: &RgbImage) -> Tiling {
        tile::tile(image.width(), image.height(), &self.config)
    }

    pub fn preprocess(&self, image: &RgbImage, tiling: &Tiling) -> Array4<f32> {
        preprocess::preprocess(image, tiling, &self.config)
    }

    /// Runs inference over a prepared tile batch, retrying once with a
    /// fresh (cloned) buffer on `InferenceFailure` before surfacing it.
    pub async fn run_inference(&self, batch: &Array4<f32>) -> Result<Array4<f32>> {
        let shape = batch.shape().to_vec();
        let data: Vec<f32> = batch.iter().copied().collect();
        let input = TensorBuffer::new(data, shape);

        let output = match self.engine.run(input.clone()).await {
            Ok(out) => out,
            Err(SpeedReaderError::InferenceFailure(msg)) => {
                tracing::warn!(error = %msg, "detector inference failed, retrying once");
                self.engine.run(input).await?
            }
            Err(e) => return Err(e),
        };

        if output.shape.len() != 4 {
            return Err(SpeedReaderError::InferenceFailure(format!(
                "expected rank-4 detector output, got shape {:?}",
                output.shape
            )));
        }
        let (n, c, h, w) = (output.shape[0], output.shape[1], output.shape[2], output.shape[3]);
        Array4::from_shape_vec((n, c, h, w), output.data)
            .map_err(|e| SpeedReaderError::InferenceFailure(e.to_string()))
    }

    pub fn postprocess(&self, probability_batch: &Array4<f32>, tiling: &Tiling) -> Vec<BoundingBox> {
        postprocess::postprocess(probability_batch, tiling, &self.config)
    }

    /// Full pipeline: tile -> preprocess -> inference -> postprocess.
    pub async fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SpeedReaderError::invalid_input("zero-sized image"));
        }
        let tiling = self.tile(image);
        let batch = self.preprocess(image, &tiling);
        let probability_batch = self.run_inference(&batch).await?;
        Ok(self.postprocess(&probability_batch, &tiling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::NullInferenceEngine;

    #[tokio::test]
    async fn zero_sized_image_is_rejected_synchronously() {
        let engine = Arc::new(NullInferenceEngine::new(None, vec![1, 1, 32, 32]));
        let detector = Detector::new(engine, DetectorConfig::default());
        let image = RgbImage::new(0, 0);
        let result = detector.detect(&image).await;
        assert!(matches!(result, Err(SpeedReaderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn detect_against_null_engine_yields_no_boxes() {
        let config = DetectorConfig::default();
        let image = RgbImage::new(640, 640);
        let tiling = tile::tile(640, 640, &config);
        let t = &tiling.tiles[0];
        let shape = vec![tiling.tiles.len(), 1, t.model_height as usize, t.model_width as usize];
        let engine = Arc::new(NullInferenceEngine::new(None, shape));
        let detector = Detector::new(engine, config);
        let boxes = detector.detect(&image).await.unwrap();
        assert!(boxes.is_empty());
    }
}

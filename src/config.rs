//! Engine-wide configuration. Numeric constants (binarize threshold,
//! dilation ratio, tile geometry, recognizer crop bounds) live here as
//! overridable fields behind a consuming-builder (`with_*`) pattern.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Target model input size before tiling kicks in.
    pub model_width: u32,
    pub model_height: u32,
    /// Tile size and minimum per-axis overlap fraction used above `model_*`.
    pub tile_size: u32,
    pub tile_overlap: f64,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub binarize_threshold: f32,
    pub min_component_area: u32,
    pub simplify_aggressiveness: f64,
    pub dilation_ratio: f64,
    pub nms_iou_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_width: 1333,
            model_height: 736,
            tile_size: 640,
            tile_overlap: 0.5,
            mean: [123.675, 116.28, 103.53],
            std: [58.395, 57.12, 57.375],
            binarize_threshold: 0.2,
            min_component_area: 9,
            simplify_aggressiveness: 1.0,
            dilation_ratio: 1.5,
            nms_iou_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    pub height: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub alphabet_size: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self { height: 48, min_width: 12, max_width: 320, alphabet_size: 6625 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub oscillation_threshold: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { oscillation_threshold: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedReaderConfig {
    pub detector: DetectorConfig,
    pub recognizer: RecognizerConfig,
    pub controller: ControllerConfig,
}

impl Default for SpeedReaderConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            recognizer: RecognizerConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl SpeedReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binarize_threshold(mut self, threshold: f32) -> Self {
        self.detector.binarize_threshold = threshold;
        self
    }

    pub fn with_dilation_ratio(mut self, ratio: f64) -> Self {
        self.detector.dilation_ratio = ratio;
        self
    }

    pub fn with_nms_iou_threshold(mut self, threshold: f64) -> Self {
        self.detector.nms_iou_threshold = threshold;
        self
    }

    pub fn with_oscillation_threshold(mut self, threshold: u32) -> Self {
        self.controller.oscillation_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SpeedReaderConfig::default();
        assert_eq!(config.detector.binarize_threshold, 0.2);
        assert_eq!(config.detector.dilation_ratio, 1.5);
        assert_eq!(config.detector.min_component_area, 9);
        assert_eq!(config.recognizer.height, 48);
        assert_eq!(config.recognizer.alphabet_size, 6625);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = SpeedReaderConfig::new().with_binarize_threshold(0.3).with_dilation_ratio(2.0);
        assert_eq!(config.detector.binarize_threshold, 0.3);
        assert_eq!(config.detector.dilation_ratio, 2.0);
    }

    #[test]
    fn serialization_round_trips() {
        let config = SpeedReaderConfig::new().with_oscillation_threshold(5);
        let json = serde_json::to_string(&config).unwrap();
        let back: SpeedReaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.controller.oscillation_threshold, 5);
    }
}

//! Visualization capability: every stage that wants to contribute to a
//! debug rendering takes a narrow capability trait rather than a
//! concrete builder type, so the artifact's lifetime is never coupled to
//! any one stage. Rendering itself lives outside this crate: it receives
//! geometry by contract and does not influence OCR output.

use ndarray::ArrayView2;

use crate::geometry::{BoundingBox, Polygon};

pub trait VisualizationBuilder: Send + Sync {
    fn add_probability_map(&self, tile_index: usize, map: ArrayView2<f32>);
    fn add_boxes(&self, boxes: &[BoundingBox]);
    fn add_polygons(&self, polygons: &[Polygon]);
}

/// Discards everything. The default handle for callers that don't want a
/// visualization artifact, and for any job that doesn't request one.
pub struct NoopVisualizationBuilder;

impl VisualizationBuilder for NoopVisualizationBuilder {
    fn add_probability_map(&self, _tile_index: usize, _map: ArrayView2<f32>) {}
    fn add_boxes(&self, _boxes: &[BoundingBox]) {}
    fn add_polygons(&self, _polygons: &[Polygon]) {}
}

use image::RgbImage;
use ndarray::{Array4, Axis};

use crate::config::DetectorConfig;
use crate::image_ops::{aspect_resize_into_canvas, hwc_to_chw, normalize_chw};

use super::tile::Tiling;

/// For each tile: crop its `source_rect`, aspect-resize into the tile's
/// padded model dimensions, convert to CHW, normalize per channel, then
/// stack tiles along the batch dimension.
pub fn preprocess(image: &RgbImage, tiling: &Tiling, config: &DetectorConfig) -> Array4<f32> {
    let mut chw_tiles = Vec::with_capacity(tiling.tiles.len());

    for t in &tiling.tiles {
        let x = t.source_rect.x.round() as u32;
        let y = t.source_rect.y.round() as u32;
        let w = (t.source_rect.width.round() as u32).min(image.width().saturating_sub(x)).max(1);
        let h = (t.source_rect.height.round() as u32).min(image.height().saturating_sub(y)).max(1);

        let cropped = image::imageops::crop_imm(image, x, y, w, h).to_image();
        let hwc = aspect_resize_into_canvas(&cropped, t.model_width, t.model_height);
        let mut chw = hwc_to_chw(&hwc);
        normalize_chw(&mut chw, config.mean, config.std);
        chw_tiles.push(chw);
    }

    let views: Vec<_> = chw_tiles.iter().map(|c| c.view()).collect();
    ndarray::stack(Axis(0), &views).expect("all tiles share (3, model_height, model_width) shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::tile::tile;

    #[test]
    fn preprocess_produces_batch_matching_tile_count() {
        let config = DetectorConfig::default();
        let image = RgbImage::new(800, 600);
        let tiling = tile(800, 600, &config);
        let batch = preprocess(&image, &tiling, &config);
        assert_eq!(batch.shape()[0], tiling.tiles.len());
        assert_eq!(batch.shape()[1], 3);
    }
}

use image::RgbImage;
use ndarray::Array4;

use crate::config::RecognizerConfig;
use crate::geometry::{oriented_crop, BoundingBox};
use crate::image_ops::scale_to_height;

/// Batched, right-padded recognizer input: `(N, 3, height, W_b)`, zero
/// everywhere past each row's own resized width.
pub struct RecognizerBatch {
    pub tensor: Array4<f32>,
    pub widths: Vec<u32>,
}

/// For each box: oriented-crop its rotated rectangle out of `image`,
/// resize to fixed `height` preserving aspect (clamped to
/// `[min_width, max_width]`), then right-pad into a shared batch tensor
/// whose width is the widest crop. Normalizes to `[-1, 1]`.
pub fn preprocess(image: &RgbImage, boxes: &[BoundingBox], config: &RecognizerConfig) -> RecognizerBatch {
    if boxes.is_empty() {
        return RecognizerBatch { tensor: Array4::zeros((0, 3, config.height as usize, 0)), widths: Vec::new() };
    }

    let resized: Vec<RgbImage> = boxes
        .iter()
        .map(|b| {
            let cropped = oriented_crop(image, &b.rotated_rectangle);
            scale_to_height(&cropped, config.height, config.min_width, config.max_width)
        })
        .collect();

    let batch_width = resized.iter().map(RgbImage::width).max().unwrap_or(config.min_width);
    let widths = resized.iter().map(RgbImage::width).collect();

    let mut tensor = Array4::<f32>::zeros((resized.len(), 3, config.height as usize, batch_width as usize));
    for (i, img) in resized.iter().enumerate() {
        for y in 0..img.height() {
            for x in 0..img.width() {
                let pixel = img.get_pixel(x, y);
                for c in 0..3 {
                    tensor[[i, c, y as usize, x as usize]] = pixel.0[c] as f32;
                }
            }
        }
    }
    tensor.mapv_inplace(|v| v / 127.5 - 1.0);

    RecognizerBatch { tensor, widths }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Polygon, PointF, RotatedRectangle};

    fn test_box(w: f64, h: f64) -> BoundingBox {
        BoundingBox::new(
            Polygon::new(vec![
                PointF::new(0.0, 0.0),
                PointF::new(w, 0.0),
                PointF::new(w, h),
                PointF::new(0.0, h),
            ]),
            RotatedRectangle::new(0.0, 0.0, w, h, 0.0),
        )
    }

    #[test]
    fn empty_boxes_yield_empty_batch() {
        let image = RgbImage::new(10, 10);
        let config = RecognizerConfig::default();
        let batch = preprocess(&image, &[], &config);
        assert_eq!(batch.tensor.shape()[0], 0);
        assert!(batch.widths.is_empty());
    }

    #[test]
    fn batch_width_matches_widest_crop_and_values_are_normalized() {
        let image = RgbImage::from_pixel(400, 100, image::Rgb([255, 255, 255]));
        let config = RecognizerConfig::default();
        let boxes = vec![test_box(100.0, 50.0), test_box(200.0, 50.0)];
        let batch = preprocess(&image, &boxes, &config);
        assert_eq!(batch.tensor.shape()[0], 2);
        assert_eq!(batch.tensor.shape()[1], 3);
        assert_eq!(batch.tensor.shape()[2], config.height as usize);
        let max_width = *batch.widths.iter().max().unwrap();
        assert_eq!(batch.tensor.shape()[3], max_width as usize);
        assert!(batch.tensor.iter().all(|&v| (-1.0..=1.0).contains(&v)));
    }
}

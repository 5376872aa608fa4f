use image::{GrayImage, Luma};
use imageproc::contours::BorderType;
use ndarray::{Array2, Array4, ArrayView2};

use crate::config::DetectorConfig;
use crate::geometry::{self, AxisAlignedRectangle, BoundingBox, Polygon, PointF};

use super::tile::Tiling;

struct Candidate {
    bbox: BoundingBox,
    score: f64,
}

/// Bicubic resize of a single-channel probability map, clamp-to-edge on
/// out-of-bounds reads. Mirrors `geometry::crop`'s cubic convolution
/// kernel but over a plain 2D grid rather than an affine-mapped crop.
fn resize_prob_map(map: ArrayView2<f32>, out_w: u32, out_h: u32) -> Array2<f32> {
    let (in_h, in_w) = (map.shape()[0], map.shape()[1]);
    if in_w == 0 || in_h == 0 || out_w == 0 || out_h == 0 {
        return Array2::zeros((out_h as usize, out_w as usize));
    }

    let cubic = |x: f64| -> f64 {
        let a = -0.5;
        let x = x.abs();
        if x <= 1.0 {
            (a + 2.0) * x.powi(3) - (a + 3.0) * x.powi(2) + 1.0
        } else if x < 2.0 {
            a * x.powi(3) - 5.0 * a * x.powi(2) + 8.0 * a * x - 4.0 * a
        } else {
            0.0
        }
    };
    let clamp_idx = |i: i64, len: usize| -> usize { i.clamp(0, len as i64 - 1) as usize };

    let scale_x = in_w as f64 / out_w as f64;
    let scale_y = in_h as f64 / out_h as f64;

    let mut out = Array2::<f32>::zeros((out_h as usize, out_w as usize));
    for oy in 0..out_h as usize {
        let sy = (oy as f64 + 0.5) * scale_y - 0.5;
        let y0 = sy.floor() as i64;
        let fy = sy - y0 as f64;
        for ox in 0..out_w as usize {
            let sx = (ox as f64 + 0.5) * scale_x - 0.5;
            let x0 = sx.floor() as i64;
            let fx = sx - x0 as f64;

            let mut acc = 0.0f64;
            for m in -1..=2 {
                let wy = cubic(fy - m as f64);
                if wy == 0.0 {
                    continue;
                }
                for n in -1..=2 {
                    let wx = cubic(fx - n as f64);
                    if wx == 0.0 {
                        continue;
                    }
                    let py = clamp_idx(y0 + m, in_h);
                    let px = clamp_idx(x0 + n, in_w);
                    acc += map[[py, px]] as f64 * wx * wy;
                }
            }
            out[[oy, ox]] = acc as f32;
        }
    }
    out
}

fn binarize(map: &Array2<f32>, threshold: f32) -> GrayImage {
    let (h, w) = (map.shape()[0] as u32, map.shape()[1] as u32);
    GrayImage::from_fn(w, h, |x, y| {
        let v = map[[y as usize, x as usize]];
        Luma([if v >= threshold { 255u8 } else { 0u8 }])
    })
}

/// Mean probability under a polygon's bounding-box mask, used as the
/// tile NMS tie-break signal (higher mean probability wins).
fn mean_probability(map: &Array2<f32>, polygon: &Polygon) -> f64 {
    let Some(aabb) = polygon.bounding_envelope() else { return 0.0 };
    let (h, w) = (map.shape()[0], map.shape()[1]);
    let x0 = (aabb.x.floor().max(0.0)) as usize;
    let y0 = (aabb.y.floor().max(0.0)) as usize;
    let x1 = ((aabb.x + aabb.width).ceil() as usize).min(w);
    let y1 = ((aabb.y + aabb.height).ceil() as usize).min(h);
    if x1 <= x0 || y1 <= y0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += map[[y, x]] as f64;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn contours_to_candidates(
    map: &Array2<f32>,
    tile_offset: (f64, f64),
    image_width: u32,
    image_height: u32,
    config: &DetectorConfig,
) -> Vec<Candidate> {
    let binary = binarize(map, config.binarize_threshold);
    let contours = imageproc::contours::find_contours::<i32>(&binary);

    let mut candidates = Vec::new();
    for contour in contours {
        if contour.border_type != BorderType::Outer || contour.points.len() <= 2 {
            continue;
        }

        let local_points: Vec<PointF> =
            contour.points.iter().map(|p| PointF::new(p.x as f64, p.y as f64)).collect();
        let local_polygon = Polygon::new(local_points);
        if local_polygon.area() < config.min_component_area as f64 {
            continue;
        }

        let simplified = geometry::simplify(&local_polygon, config.simplify_aggressiveness);
        let Some(hull) = geometry::convex_hull(&simplified.points) else { continue };
        let Some(mut dilated) = geometry::dilate(hull.polygon(), config.dilation_ratio) else {
            continue;
        };
        if dilated.points.len() < 4 {
            continue;
        }

        // Clamp within this tile's own local bounds, then shift into
        // absolute image coordinates.
        dilated.clamp_to_bounds(map.shape()[1] as f64, map.shape()[0] as f64);
        for p in &mut dilated.points {
            p.x += tile_offset.0;
            p.y += tile_offset.1;
        }
        dilated.clamp_to_bounds(image_width as f64, image_height as f64);

        let Some(rotated_rect) = geometry::min_area_rect(&dilated.points) else { continue };
        let score = mean_probability(map, &local_polygon);

        candidates.push(Candidate { bbox: BoundingBox::new(dilated, rotated_rect), score });
    }
    candidates
}

fn iou_aabb(a: &AxisAlignedRectangle, b: &AxisAlignedRectangle) -> f64 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);
    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }
    let union = a.width * a.height + b.width * b.height - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy NMS across all tiles' candidates, keyed on AxisAlignedRectangle
/// IoU, tie-broken by higher mean probability of the originating region.
fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f64) -> Vec<BoundingBox> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let mut kept: Vec<Candidate> = Vec::new();
    'outer: for candidate in candidates {
        for existing in &kept {
            if iou_aabb(&candidate.bbox.rectangle, &existing.bbox.rectangle) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }

    kept.into_iter().map(|c| c.bbox).collect()
}

/// Turns a detector's raw probability batch into ordered bounding boxes.
/// `probability_batch` has shape `(N, 1, H, W)`, one map per tile.
pub fn postprocess(
    probability_batch: &Array4<f32>,
    tiling: &Tiling,
    config: &DetectorConfig,
) -> Vec<BoundingBox> {
    let mut all_candidates = Vec::new();

    for (tile, map) in tiling.tiles.iter().zip(probability_batch.outer_iter()) {
        let full_map = map.index_axis(ndarray::Axis(0), 0);
        let fitted = full_map
            .slice(ndarray::s![0..tile.fitted_height as usize, 0..tile.fitted_width as usize]);
        let resized = resize_prob_map(
            fitted,
            tile.source_rect.width.round() as u32,
            tile.source_rect.height.round() as u32,
        );

        let mut candidates = contours_to_candidates(
            &resized,
            (tile.source_rect.x, tile.source_rect.y),
            tiling.image_width,
            tiling.image_height,
            config,
        );
        all_candidates.append(&mut candidates);
    }

    let mut boxes = non_maximum_suppression(all_candidates, config.nms_iou_threshold);
    boxes.sort_by(|a, b| {
        a.rotated_rectangle
            .y
            .partial_cmp(&b.rotated_rectangle.y)
            .unwrap()
            .then(a.rotated_rectangle.x.partial_cmp(&b.rotated_rectangle.x).unwrap())
    });
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::tile::tile;

    #[test]
    fn empty_probability_map_yields_no_boxes() {
        let config = DetectorConfig::default();
        let tiling = tile(640, 640, &config);
        let shape = (
            tiling.tiles.len(),
            1,
            tiling.tiles[0].model_height as usize,
            tiling.tiles[0].model_width as usize,
        );
        let batch = Array4::<f32>::zeros(shape);
        let boxes = postprocess(&batch, &tiling, &config);
        assert!(boxes.is_empty());
    }

    #[test]
    fn a_single_bright_square_produces_one_box() {
        let config = DetectorConfig::default();
        let tiling = tile(640, 640, &config);
        let t = &tiling.tiles[0];
        let mut batch = Array4::<f32>::zeros((1, 1, t.model_height as usize, t.model_width as usize));
        for y in 100..140 {
            for x in 100..160 {
                batch[[0, 0, y, x]] = 1.0;
            }
        }
        let boxes = postprocess(&batch, &tiling, &config);
        assert_eq!(boxes.len(), 1);
    }
}

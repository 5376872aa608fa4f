use crate::config::DetectorConfig;
use crate::geometry::AxisAlignedRectangle;

/// One contiguous sub-region of the input image processed by the
/// detector. `source_rect` is in original-image coordinates; `scale` maps
/// source_rect dimensions to `(fitted_width, fitted_height)`, the
/// resized-but-not-yet-padded region inside the `model_width x
/// model_height` tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub source_rect: AxisAlignedRectangle,
    pub model_width: u32,
    pub model_height: u32,
    pub fitted_width: u32,
    pub fitted_height: u32,
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct Tiling {
    pub tiles: Vec<Tile>,
    pub image_width: u32,
    pub image_height: u32,
}

fn round_up_to_multiple(value: u32, multiple: u32) -> u32 {
    value.div_ceil(multiple) * multiple
}

/// Decides the set of input regions for one image. Images that fit inside
/// (a generous margin around) the `model_width x model_height` budget get
/// a single aspect-fit tile, padded to multiples of 32. Images much
/// larger than that are partitioned into overlapping `tile_size` tiles
/// with >= 50% overlap on each axis, so no text region straddling a tile
/// boundary is missed entirely by every tile.
pub fn tile(image_width: u32, image_height: u32, config: &DetectorConfig) -> Tiling {
    let fits_single_tile =
        image_width <= config.model_width * 2 && image_height <= config.model_height * 2;

    let tiles = if fits_single_tile {
        vec![single_fit_tile(image_width, image_height, config)]
    } else {
        grid_tiles(image_width, image_height, config)
    };

    Tiling { tiles, image_width, image_height }
}

fn single_fit_tile(image_width: u32, image_height: u32, config: &DetectorConfig) -> Tile {
    let scale = (config.model_width as f64 / image_width as f64)
        .min(config.model_height as f64 / image_height as f64);
    let fitted_width = (image_width as f64 * scale).round().max(1.0) as u32;
    let fitted_height = (image_height as f64 * scale).round().max(1.0) as u32;

    Tile {
        source_rect: AxisAlignedRectangle::new(0.0, 0.0, image_width as f64, image_height as f64),
        model_width: round_up_to_multiple(fitted_width, 32),
        model_height: round_up_to_multiple(fitted_height, 32),
        fitted_width,
        fitted_height,
        scale,
    }
}

fn grid_tiles(image_width: u32, image_height: u32, config: &DetectorConfig) -> Vec<Tile> {
    let size = config.tile_size;
    let stride = ((size as f64) * (1.0 - config.tile_overlap)).floor().max(1.0) as u32;

    let xs = axis_positions(image_width, size, stride);
    let ys = axis_positions(image_height, size, stride);

    let mut tiles = Vec::with_capacity(xs.len() * ys.len());
    for &oy in &ys {
        for &ox in &xs {
            let w = size.min(image_width);
            let h = size.min(image_height);
            tiles.push(Tile {
                source_rect: AxisAlignedRectangle::new(ox as f64, oy as f64, w as f64, h as f64),
                model_width: round_up_to_multiple(w, 32),
                model_height: round_up_to_multiple(h, 32),
                fitted_width: w,
                fitted_height: h,
                scale: 1.0,
            });
        }
    }
    tiles
}

/// Start positions along one axis covering `len` with tiles of `size`,
/// spaced `stride` apart, with the last tile clamped to the far edge so
/// no content past the last full step goes uncovered.
fn axis_positions(len: u32, size: u32, stride: u32) -> Vec<u32> {
    if len <= size {
        return vec![0];
    }
    let last = len - size;
    let mut positions = Vec::new();
    let mut pos = 0u32;
    while pos < last {
        positions.push(pos);
        pos += stride;
    }
    positions.push(last);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_image_gets_single_tile() {
        let config = DetectorConfig::default();
        let tiling = tile(800, 600, &config);
        assert_eq!(tiling.tiles.len(), 1);
        assert_eq!(tiling.tiles[0].model_width % 32, 0);
        assert_eq!(tiling.tiles[0].model_height % 32, 0);
    }

    #[test]
    fn large_image_gets_overlapping_grid() {
        let config = DetectorConfig::default();
        let tiling = tile(4000, 3000, &config);
        assert!(tiling.tiles.len() > 1);
        for t in &tiling.tiles {
            assert!(t.source_rect.width <= config.tile_size as f64);
            assert!(t.source_rect.height <= config.tile_size as f64);
        }
    }

    #[test]
    fn grid_tiles_overlap_at_least_half() {
        let positions = axis_positions(4000, 640, 320);
        for w in positions.windows(2) {
            let gap = w[1] - w[0];
            assert!(gap <= 320, "stride {gap} exceeds 50% overlap requirement for tile 640");
        }
    }
}

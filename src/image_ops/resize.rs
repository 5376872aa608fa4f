use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array3;

/// Resizes `src` preserving aspect ratio to fit inside `dst_w x dst_h`,
/// using a cubic filter (the `image` crate's `CatmullRom`, the closest
/// available match to bicubic), then copies it into the top-left of a
/// zero-padded `dst_h x dst_w x 3` HWC float canvas.
pub fn aspect_resize_into_canvas(src: &RgbImage, dst_w: u32, dst_h: u32) -> Array3<f32> {
    let (src_w, src_h) = src.dimensions();
    let scale = (dst_w as f64 / src_w as f64).min(dst_h as f64 / src_h as f64);
    let new_w = (src_w as f64 * scale).round().max(1.0) as u32;
    let new_h = (src_h as f64 * scale).round().max(1.0) as u32;

    let resized = image::imageops::resize(src, new_w, new_h, FilterType::CatmullRom);

    let mut canvas = Array3::<f32>::zeros((dst_h as usize, dst_w as usize, 3));
    for y in 0..new_h.min(dst_h) {
        for x in 0..new_w.min(dst_w) {
            let pixel = resized.get_pixel(x, y);
            for c in 0..3 {
                canvas[[y as usize, x as usize, c]] = pixel.0[c] as f32;
            }
        }
    }
    canvas
}

/// Resizes `src` to a fixed `height`, choosing a width that preserves
/// aspect ratio and is clamped to `[min_width, max_width]`. Returns the
/// resized image (no batch-canvas padding — the recognizer composes
/// multiple crops of varying width into a shared padded batch tensor).
pub fn scale_to_height(src: &RgbImage, height: u32, min_width: u32, max_width: u32) -> RgbImage {
    let (src_w, src_h) = src.dimensions();
    let aspect = src_w as f64 / src_h as f64;
    let target_w = ((aspect * height as f64).round() as u32).clamp(min_width, max_width);
    image::imageops::resize(src, target_w, height, FilterType::CatmullRom)
}

use ndarray::Array3;

/// Transposes an HWC float buffer into CHW.
pub fn hwc_to_chw(hwc: &Array3<f32>) -> Array3<f32> {
    hwc.view().permuted_axes([2, 0, 1]).as_standard_layout().to_owned()
}

/// Per-channel normalize of a CHW buffer in place: `x <- (x - mean_c) / std_c`.
pub fn normalize_chw(chw: &mut Array3<f32>, means: [f32; 3], stds: [f32; 3]) {
    for c in 0..3 {
        let mut channel = chw.index_axis_mut(ndarray::Axis(0), c);
        channel.mapv_inplace(|x| (x - means[c]) / stds[c]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn hwc_to_chw_transposes_shape() {
        let hwc = Array3::<f32>::zeros((10, 20, 3));
        let chw = hwc_to_chw(&hwc);
        assert_eq!(chw.shape(), &[3, 10, 20]);
    }

    #[test]
    fn normalize_applies_per_channel() {
        let mut chw = Array3::<f32>::from_elem((3, 2, 2), 100.0);
        normalize_chw(&mut chw, [100.0, 0.0, 50.0], [1.0, 2.0, 2.0]);
        assert_eq!(chw[[0, 0, 0]], 0.0);
        assert_eq!(chw[[1, 0, 0]], 50.0);
        assert_eq!(chw[[2, 0, 0]], 25.0);
    }
}

//! Image kernels: aspect-preserving resize into a fixed tensor layout,
//! HWC->CHW conversion, and per-channel normalization.

pub mod layout;
pub mod resize;

pub use layout::{hwc_to_chw, normalize_chw};
pub use resize::{aspect_resize_into_canvas, scale_to_height};

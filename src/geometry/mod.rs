//! Geometry kernels: convex hull, rotated rectangles, polygon dilation and
//! simplification, oriented crop, and polygon IoU. Leaf module with no
//! dependency on the detector/recognizer/pipeline layers above it.

pub mod crop;
pub mod dilate;
pub mod hull;
pub mod iou;
pub mod rotated_rect;
pub mod simplify;
pub mod types;

pub use crop::oriented_crop;
pub use dilate::dilate;
pub use hull::convex_hull;
pub use iou::iou;
pub use rotated_rect::{from_corners, min_area_rect};
pub use simplify::simplify;
pub use types::{AxisAlignedRectangle, BoundingBox, ConvexHull, Point, PointF, Polygon, RotatedRectangle};

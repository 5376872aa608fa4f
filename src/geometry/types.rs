use serde::{Deserialize, Serialize};

/// Integer pixel coordinate, always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn to_f(self) -> PointF {
        PointF::new(self.x as f64, self.y as f64)
    }
}

/// Floating-point coordinate. Rounding on `PointF -> Point` uses
/// round-half-away-from-zero via `f64::round`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x.round().max(0.0) as u32, self.y.round().max(0.0) as u32)
    }

    pub fn dist(&self, other: &PointF) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Ordered sequence of points, implicitly closed (last connects to first).
/// Fewer than 3 points is the "degenerate" state: valid to construct, but
/// hull/dilate operations over it return `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<PointF>,
}

impl Polygon {
    pub fn new(points: Vec<PointF>) -> Self {
        Self { points }
    }

    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Signed area via the shoelace formula. Positive for CCW winding.
    pub fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let n = self.points.len();
        let mut sum = 0.0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            sum += p.x * q.y - q.x * p.y;
        }
        sum / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let n = self.points.len();
        (0..n).map(|i| self.points[i].dist(&self.points[(i + 1) % n])).sum()
    }

    pub fn bounding_envelope(&self) -> Option<AxisAlignedRectangle> {
        if self.points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(AxisAlignedRectangle {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(0.0),
            height: (max_y - min_y).max(0.0),
        })
    }

    pub fn clamp_to_bounds(&mut self, width: f64, height: f64) {
        for p in &mut self.points {
            p.x = p.x.clamp(0.0, width);
            p.y = p.y.clamp(0.0, height);
        }
    }
}

/// A polygon with invariant: strictly convex, CCW, >= 3 points, no three
/// collinear. Constructed only by `geometry::hull::convex_hull`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexHull(pub Polygon);

impl ConvexHull {
    pub fn polygon(&self) -> &Polygon {
        &self.0
    }

    pub fn into_polygon(self) -> Polygon {
        self.0
    }
}

/// (x, y) is the top-left corner; width/height > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignedRectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl AxisAlignedRectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_corners(points: &[PointF]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y })
    }
}

/// (x, y, width, height, angle_radians). width runs along (cos θ, sin θ);
/// height runs perpendicular. (x, y) is the "top-left" corner in the
/// rectangle's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl RotatedRectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64, angle: f64) -> Self {
        Self { x, y, width, height, angle }
    }

    /// Four corners in clockwise order, starting from (x, y).
    pub fn corners(&self) -> [PointF; 4] {
        let (sin_t, cos_t) = self.angle.sin_cos();
        let top_left = PointF::new(self.x, self.y);
        let top_right = PointF::new(self.x + self.width * cos_t, self.y + self.width * sin_t);
        let bottom_right = PointF::new(
            self.x + self.width * cos_t - self.height * sin_t,
            self.y + self.width * sin_t + self.height * cos_t,
        );
        let bottom_left = PointF::new(self.x - self.height * sin_t, self.y + self.height * cos_t);
        [top_left, top_right, bottom_right, bottom_left]
    }

    pub fn axis_aligned_envelope(&self) -> AxisAlignedRectangle {
        AxisAlignedRectangle::from_corners(&self.corners())
            .expect("corners() always returns 4 points")
    }
}

/// Triple describing one detected region at decreasing fidelity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub polygon: Polygon,
    pub rotated_rectangle: RotatedRectangle,
    pub rectangle: AxisAlignedRectangle,
}

impl BoundingBox {
    pub fn new(polygon: Polygon, rotated_rectangle: RotatedRectangle) -> Self {
        let rectangle = rotated_rectangle.axis_aligned_envelope();
        Self { polygon, rotated_rectangle, rectangle }
    }
}

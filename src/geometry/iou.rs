use geo_clipper::Clipper;
use geo_types::{Coord, LineString, Polygon as GeoPolygon};

use super::types::Polygon;

fn to_geo_polygon(polygon: &Polygon) -> GeoPolygon<f64> {
    let coords: Vec<Coord<f64>> = polygon.points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    GeoPolygon::new(LineString::new(coords), vec![])
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    let coords: Vec<Coord<f64>> = ring.0.clone();
    if coords.len() < 3 {
        return 0.0;
    }
    let n = coords.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = coords[i];
        let b = coords[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum / 2.0).abs()
}

/// Intersection-over-union of two polygons, via polygon clipping
/// (intersection area / union area). Degenerate polygons (< 3 points)
/// contribute zero area.
pub fn iou(a: &Polygon, b: &Polygon) -> f64 {
    if a.is_degenerate() || b.is_degenerate() {
        return 0.0;
    }
    let geo_a = to_geo_polygon(a);
    let geo_b = to_geo_polygon(b);

    let intersection = geo_a.intersection(&geo_b, 1.0);
    let inter_area: f64 = intersection.iter().map(|p| ring_area(p.exterior())).sum();
    if inter_area <= 0.0 {
        return 0.0;
    }

    let union = geo_a.union(&geo_b, 1.0);
    let union_area: f64 = union.iter().map(|p| ring_area(p.exterior())).sum();
    if union_area <= 0.0 {
        return 0.0;
    }

    (inter_area / union_area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::types::PointF;

    fn square(x: f64, y: f64, s: f64) -> Polygon {
        Polygon::new(vec![
            PointF::new(x, y),
            PointF::new(x + s, y),
            PointF::new(x + s, y + s),
            PointF::new(x, y + s),
        ])
    }

    #[test]
    fn identical_squares_have_iou_one() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(0.0, 0.0, 10.0);
        assert!((iou(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_squares_have_iou_zero() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(100.0, 100.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn half_overlapping_squares() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);
        let value = iou(&a, &b);
        // intersection 5x10=50, union 150 -> 1/3
        assert!((value - (1.0 / 3.0)).abs() < 0.01);
    }
}

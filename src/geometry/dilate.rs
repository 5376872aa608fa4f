use geo_clipper::{Clipper, EndType, JoinType};
use geo_types::{Coord, LineString, Polygon as GeoPolygon};

use super::types::Polygon;

/// Vatti-style polygon offsetting with round joins. Offset distance is
/// `area * ratio / perimeter`; positive `ratio` grows the polygon, negative
/// shrinks it. A perimeter of zero (degenerate input) returns `None`.
pub fn dilate(polygon: &Polygon, ratio: f64) -> Option<Polygon> {
    if polygon.is_degenerate() {
        return None;
    }
    let perimeter = polygon.perimeter();
    if perimeter <= 0.0 {
        return None;
    }
    let distance = polygon.area() * ratio / perimeter;

    let coords: Vec<Coord<f64>> = polygon
        .points
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    let geo_poly = GeoPolygon::new(LineString::new(coords), vec![]);

    let solution = geo_poly
        .offset(distance, JoinType::Round(2.0), EndType::ClosedPolygon, 1.0)
        .0;

    let result = solution.first()?;
    let points: Vec<super::types::PointF> = result
        .exterior()
        .points()
        .map(|p| super::types::PointF::new(p.x(), p.y()))
        .collect();

    if points.len() < 3 {
        return None;
    }
    Some(Polygon::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::types::PointF;

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            PointF::new(0.0, 0.0),
            PointF::new(10.0, 0.0),
            PointF::new(10.0, 10.0),
            PointF::new(0.0, 10.0),
        ])
    }

    #[test]
    fn positive_ratio_grows_area() {
        let square = unit_square();
        let dilated = dilate(&square, 1.5).unwrap();
        assert!(dilated.area() > square.area());
    }

    #[test]
    fn negative_ratio_shrinks_area() {
        let square = unit_square();
        let dilated = dilate(&square, -0.1).unwrap();
        assert!(dilated.area() < square.area());
    }

    #[test]
    fn degenerate_polygon_has_no_dilation() {
        let degenerate = Polygon::new(vec![PointF::new(0.0, 0.0), PointF::new(1.0, 1.0)]);
        assert!(dilate(&degenerate, 1.5).is_none());
    }
}

use super::types::{Polygon, PointF};

fn triangle_area(a: PointF, b: PointF, c: PointF) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() / 2.0
}

/// Visvalingam-Whyatt polygon simplification. Repeatedly removes the
/// vertex whose triangle area (with its current neighbors) is smallest,
/// until either the next-smallest area exceeds `aggressiveness` or only 3
/// vertices remain. Vertex order is preserved.
pub fn simplify(polygon: &Polygon, aggressiveness: f64) -> Polygon {
    let mut pts = polygon.points.clone();
    if pts.len() <= 3 {
        return Polygon::new(pts);
    }

    loop {
        let n = pts.len();
        if n <= 3 {
            break;
        }
        let mut min_area = f64::MAX;
        let mut min_idx = 0usize;
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            let area = triangle_area(prev, cur, next);
            if area < min_area {
                min_area = area;
                min_idx = i;
            }
        }
        if min_area > aggressiveness {
            break;
        }
        pts.remove(min_idx);
    }

    Polygon::new(pts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_preserves_order_and_stops_at_three() {
        let octagon = Polygon::new(
            (0..8)
                .map(|i| {
                    let theta = i as f64 * std::f64::consts::TAU / 8.0;
                    PointF::new(theta.cos() * 10.0, theta.sin() * 10.0)
                })
                .collect(),
        );
        let simplified = simplify(&octagon, 0.001);
        assert!(simplified.points.len() >= 3);
        assert!(simplified.points.len() <= octagon.points.len());
    }

    #[test]
    fn high_aggressiveness_collapses_to_triangle() {
        let octagon = Polygon::new(
            (0..8)
                .map(|i| {
                    let theta = i as f64 * std::f64::consts::TAU / 8.0;
                    PointF::new(theta.cos() * 10.0, theta.sin() * 10.0)
                })
                .collect(),
        );
        let simplified = simplify(&octagon, 1e9);
        assert_eq!(simplified.points.len(), 3);
    }
}

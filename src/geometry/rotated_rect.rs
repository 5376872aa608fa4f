use super::hull::convex_hull;
use super::types::{PointF, RotatedRectangle};

/// Minimum-area enclosing rectangle of a point set via rotating calipers
/// over the convex hull. For each hull edge, project every hull point onto
/// the edge direction and its perpendicular, take the axis-aligned
/// envelope in that frame, and keep the envelope of minimum area. Ties
/// (within floating-point tolerance) prefer the orientation with |angle|
/// nearest zero.
pub fn min_area_rect(points: &[PointF]) -> Option<RotatedRectangle> {
    let hull = convex_hull(points)?;
    let hull_points = &hull.polygon().points;
    let n = hull_points.len();

    let mut best: Option<(f64, RotatedRectangle)> = None;

    for i in 0..n {
        let a = hull_points[i];
        let b = hull_points[(i + 1) % n];
        let edge_angle = (b.y - a.y).atan2(b.x - a.x);
        let (sin_t, cos_t) = edge_angle.sin_cos();

        let mut min_u = f64::MAX;
        let mut max_u = f64::MIN;
        let mut min_v = f64::MAX;
        let mut max_v = f64::MIN;
        for p in hull_points.iter() {
            let dx = p.x - a.x;
            let dy = p.y - a.y;
            let u = dx * cos_t + dy * sin_t;
            let v = -dx * sin_t + dy * cos_t;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width_local = max_u - min_u;
        let height_local = max_v - min_v;
        let area = width_local * height_local;

        // World-space coordinates of the local frame's (min_u, min_v) and
        // (max_u, min_v) corners; whichever becomes the rectangle's "origin"
        // depends on which local axis ends up as width below.
        let corner_min_u = PointF::new(
            a.x + min_u * cos_t - min_v * sin_t,
            a.y + min_u * sin_t + min_v * cos_t,
        );
        let corner_max_u = PointF::new(
            a.x + max_u * cos_t - min_v * sin_t,
            a.y + max_u * sin_t + min_v * cos_t,
        );

        let (width, height, angle, origin) = if width_local >= height_local {
            (width_local, height_local, edge_angle, corner_min_u)
        } else {
            // Swap so width is always the longer side; the new width axis
            // is the old perpendicular (v) direction, rotated +90deg.
            (
                height_local,
                width_local,
                edge_angle + std::f64::consts::FRAC_PI_2,
                corner_max_u,
            )
        };
        let normalized_angle = normalize_angle(angle);

        let candidate = RotatedRectangle::new(origin.x, origin.y, width, height, normalized_angle);

        match &best {
            None => best = Some((area, candidate)),
            Some((best_area, best_rect)) => {
                if area < *best_area - 1e-9 {
                    best = Some((area, candidate));
                } else if (area - *best_area).abs() <= 1e-9
                    && candidate.angle.abs() < best_rect.angle.abs()
                {
                    best = Some((area, candidate));
                }
            }
        }
    }

    best.map(|(_, rect)| rect)
}

/// Normalize an angle into (-pi/2, pi/2], since width/height are
/// interchangeable under a +-pi/2 rotation for an unoriented rectangle.
fn normalize_angle(mut angle: f64) -> f64 {
    let pi = std::f64::consts::PI;
    while angle > pi / 2.0 {
        angle -= pi;
    }
    while angle <= -pi / 2.0 {
        angle += pi;
    }
    angle
}

/// Reconstruct a RotatedRectangle from four clockwise corners. Verifies
/// two pairs of parallel sides; the longer pair defines width; the "top
/// edge" is the long edge with the smaller y-midpoint.
///
/// The detector pipeline never calls this path directly (it always derives
/// its rectangle from `min_area_rect`); this exists for callers who already
/// hold four ordered corners, e.g. round-tripping a serialized box.
pub fn from_corners(corners: &[PointF; 4]) -> Option<RotatedRectangle> {
    let edges: Vec<(PointF, PointF, f64)> = (0..4)
        .map(|i| {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            (a, b, a.dist(&b))
        })
        .collect();

    // Opposite edges (0,2) and (1,3) should be the two parallel pairs.
    let pair_a_len = (edges[0].2 + edges[2].2) / 2.0;
    let pair_b_len = (edges[1].2 + edges[3].2) / 2.0;

    let (long_pair_idx, long_len) = if pair_a_len >= pair_b_len {
        (0, pair_a_len)
    } else {
        (1, pair_b_len)
    };
    let short_len = if long_pair_idx == 0 { pair_b_len } else { pair_a_len };

    if long_len <= 0.0 || short_len <= 0.0 {
        return None;
    }

    // Pick whichever of the two parallel long edges has the smaller
    // y-midpoint as the canonical "top edge".
    let candidate_a = edges[long_pair_idx];
    let candidate_b = edges[long_pair_idx + 2];
    let mid_a = (candidate_a.0.y + candidate_a.1.y) / 2.0;
    let mid_b = (candidate_b.0.y + candidate_b.1.y) / 2.0;
    let top_edge = if mid_a <= mid_b { candidate_a } else { candidate_b };

    let angle = (top_edge.1.y - top_edge.0.y).atan2(top_edge.1.x - top_edge.0.x);
    let (x, y) = if top_edge.0.x <= top_edge.1.x {
        (top_edge.0.x, top_edge.0.y)
    } else {
        (top_edge.1.x, top_edge.1.y)
    };

    Some(RotatedRectangle::new(x, y, long_len, short_len, angle))
}

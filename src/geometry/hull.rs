use super::types::{ConvexHull, Polygon, PointF};

/// Cross product of (o->a) and (o->b). Positive for a left turn.
fn cross(o: PointF, a: PointF, b: PointF) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull of a point set via Graham scan. Returns `None` when the
/// input collapses to fewer than 3 distinct hull vertices (collinear or
/// coincident points).
pub fn convex_hull(points: &[PointF]) -> Option<ConvexHull> {
    if points.len() < 3 {
        return None;
    }

    let anchor_idx = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.y.partial_cmp(&b.y)
                .unwrap()
                .then(a.x.partial_cmp(&b.x).unwrap())
        })
        .map(|(i, _)| i)
        .unwrap();
    let anchor = points[anchor_idx];

    let mut rest: Vec<PointF> = points
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, _)| *i != anchor_idx)
        .map(|(_, p)| p)
        .collect();

    rest.sort_by(|a, b| {
        let angle_a = (a.y - anchor.y).atan2(a.x - anchor.x);
        let angle_b = (b.y - anchor.y).atan2(b.x - anchor.x);
        angle_a
            .partial_cmp(&angle_b)
            .unwrap()
            .then_with(|| anchor.dist(a).partial_cmp(&anchor.dist(b)).unwrap())
    });

    let mut stack: Vec<PointF> = vec![anchor];
    for p in rest {
        while stack.len() >= 2 {
            let top = stack[stack.len() - 1];
            let second = stack[stack.len() - 2];
            if cross(second, top, p) <= 0.0 {
                stack.pop();
            } else {
                break;
            }
        }
        stack.push(p);
    }

    if stack.len() < 3 {
        return None;
    }

    Some(ConvexHull(Polygon::new(stack)))
}

//! Planar ring helpers: cleanup, orientation and containment nesting.

use glam::DVec2;

use super::Outline;

/// Rings with less absolute area than this are dropped
pub const MIN_RING_AREA: f64 = 1e-9;

/// Points closer than this are merged
const POINT_EPSILON: f64 = 1e-9;

/// Relative cross-product below which a vertex counts as collinear
const COLLINEAR_EPSILON: f64 = 1e-12;

/// One flattened sub-path
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub points: Vec<DVec2>,
    /// Source sub-path ended with an explicit close
    pub closed: bool,
}

/// Shoelace signed area; positive for counter-clockwise in y-up coordinates
pub fn signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Even-odd crossing test
pub fn contains_point(ring: &[DVec2], p: DVec2) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Merge duplicate and collinear points, drop the closing duplicate.
/// Returns `None` when fewer than three points or no area remain.
pub fn clean_ring(ring: Ring) -> Option<Ring> {
    let mut points: Vec<DVec2> = Vec::with_capacity(ring.points.len());
    for p in ring.points {
        if !p.is_finite() {
            continue;
        }
        if points.last().is_some_and(|last| last.distance(p) <= POINT_EPSILON) {
            continue;
        }
        points.push(p);
    }
    while points.len() > 1 && points[0].distance(points[points.len() - 1]) <= POINT_EPSILON {
        points.pop();
    }

    remove_collinear(&mut points);

    if points.len() < 3 || signed_area(&points).abs() < MIN_RING_AREA {
        return None;
    }
    Some(Ring {
        points,
        closed: ring.closed,
    })
}

fn remove_collinear(points: &mut Vec<DVec2>) {
    let mut changed = true;
    while changed && points.len() >= 3 {
        changed = false;
        let n = points.len();
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            let e1 = cur - prev;
            let e2 = next - cur;
            let scale = e1.length() * e2.length();
            if scale <= 0.0 || (e1.perp_dot(e2) / scale).abs() < COLLINEAR_EPSILON {
                points.remove(i);
                changed = true;
                break;
            }
        }
    }
}

/// Reverse `points` if needed so its signed area has the sign of `positive`
pub fn orient(points: &mut [DVec2], positive: bool) {
    if (signed_area(points) > 0.0) != positive {
        points.reverse();
    }
}

/// Group the rings of one path element into outlines.
///
/// A ring nested inside an even number of other rings is a contour, an
/// odd number makes it a hole of its immediate parent. Contours come out
/// counter-clockwise, holes clockwise, in source order.
pub fn nest_rings(rings: Vec<Ring>) -> Vec<Outline> {
    let areas: Vec<f64> = rings.iter().map(|r| signed_area(&r.points).abs()).collect();

    // Largest first so every potential parent is processed before its children
    let mut order: Vec<usize> = (0..rings.len()).collect();
    order.sort_by(|&a, &b| areas[b].total_cmp(&areas[a]));

    let mut parent: Vec<Option<usize>> = vec![None; rings.len()];
    let mut depth: Vec<usize> = vec![0; rings.len()];

    for (pos, &i) in order.iter().enumerate() {
        let sample = rings[i].points[0];
        // Smallest enclosing ring seen so far is the immediate parent
        let enclosing = order[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&j| areas[j] > areas[i] && contains_point(&rings[j].points, sample));
        if let Some(j) = enclosing {
            parent[i] = Some(j);
            depth[i] = depth[j] + 1;
        }
    }

    let mut outline_of: Vec<Option<usize>> = vec![None; rings.len()];
    let mut outlines: Vec<Outline> = Vec::new();

    for (i, ring) in rings.iter().enumerate() {
        if depth[i] % 2 == 0 {
            let mut contour = ring.points.clone();
            orient(&mut contour, true);
            outline_of[i] = Some(outlines.len());
            outlines.push(Outline {
                contour,
                holes: Vec::new(),
                closed: ring.closed,
            });
        }
    }

    for (i, ring) in rings.into_iter().enumerate() {
        if depth[i] % 2 == 1 {
            let Some(owner) = parent[i].and_then(|p| outline_of[p]) else {
                continue;
            };
            let mut hole = ring.points;
            orient(&mut hole, false);
            outlines[owner].holes.push(hole);
        }
    }

    outlines
}

//! Planar polygon helpers shared by body construction and the draw pass.
//!
//! All polygons are plain `Vec<Vec2>` vertex loops (no repeated closing
//! vertex). Counter-clockwise means positive signed area in a y-up frame.

use crate::error::{GameError, GameResult};
use bevy::prelude::*;
use earcutr::earcut;

/// Tolerance used for orientation tests.
const EPSILON: f32 = 1e-4;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Bounds of a point set; `None` when empty.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Twice-free signed area (shoelace). Positive for counter-clockwise loops.
pub fn signed_area(points: &[Vec2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}

pub fn area(points: &[Vec2]) -> f32 {
    signed_area(points).abs()
}

/// Area-weighted centroid; falls back to the vertex mean for zero-area loops.
pub fn centroid(points: &[Vec2]) -> Vec2 {
    let a = signed_area(points);
    if a.abs() < EPSILON {
        if points.is_empty() {
            return Vec2::ZERO;
        }
        return points.iter().copied().sum::<Vec2>() / points.len() as f32;
    }
    let mut c = Vec2::ZERO;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        c += (p + q) * p.perp_dot(q);
    }
    c / (6.0 * a)
}

/// Area-weighted centroid of several parts taken together.
pub fn compound_centroid(parts: &[Vec<Vec2>]) -> Vec2 {
    let total: f32 = parts.iter().map(|p| area(p)).sum();
    if total < EPSILON {
        let all: Vec<Vec2> = parts.iter().flatten().copied().collect();
        return centroid(&all);
    }
    parts
        .iter()
        .map(|p| centroid(p) * area(p))
        .sum::<Vec2>()
        / total
}

pub fn is_ccw(points: &[Vec2]) -> bool {
    signed_area(points) > 0.0
}

/// Reverse the loop in place if it winds clockwise.
pub fn make_ccw(points: &mut [Vec2]) {
    if signed_area(points) < 0.0 {
        points.reverse();
    }
}

/// Drop consecutive near-duplicate vertices, including a repeated closing vertex.
pub fn dedup_outline(points: &[Vec2], min_dist: f32) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_none_or(|q| q.distance(p) >= min_dist) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance(out[out.len() - 1]) < min_dist {
        out.pop();
    }
    out
}

/// Distance from `p` to the segment `a → b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Ramer–Douglas–Peucker over a closed loop: drop vertices that sit within
/// `tolerance` of the simplified outline.
///
/// The loop is split at the vertex farthest from the first one, and each half
/// is simplified as an open polyline. Loops of three or fewer vertices, and a
/// non-positive tolerance, come back unchanged.
pub fn simplify_loop(points: &[Vec2], tolerance: f32) -> Vec<Vec2> {
    let n = points.len();
    if n <= 3 || tolerance <= 0.0 {
        return points.to_vec();
    }
    let far = (1..n)
        .max_by(|&i, &j| {
            points[0]
                .distance_squared(points[i])
                .total_cmp(&points[0].distance_squared(points[j]))
        })
        .unwrap_or(n / 2);

    // Index `n` stands for the first vertex again, closing the loop.
    let at = |i: usize| points[i % n];
    let mut keep = vec![false; n + 1];
    keep[0] = true;
    keep[far] = true;
    keep[n] = true;

    let mut spans = vec![(0, far), (far, n)];
    while let Some((first, last)) = spans.pop() {
        let (a, b) = (at(first), at(last));
        let farthest = (first + 1..last)
            .map(|i| (i, segment_distance(at(i), a, b)))
            .max_by(|x, y| x.1.total_cmp(&y.1));
        if let Some((i, dist)) = farthest {
            if dist > tolerance {
                keep[i] = true;
                spans.push((first, i));
                spans.push((i, last));
            }
        }
    }
    (0..n).filter(|&i| keep[i]).map(|i| points[i]).collect()
}

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x <= a.x.max(b.x) + EPSILON
        && p.x >= a.x.min(b.x) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
}

/// Closed-segment intersection test (touching counts).
pub fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if ((o1 > EPSILON && o2 < -EPSILON) || (o1 < -EPSILON && o2 > EPSILON))
        && ((o3 > EPSILON && o4 < -EPSILON) || (o3 < -EPSILON && o4 > EPSILON))
    {
        return true;
    }
    (o1.abs() <= EPSILON && on_segment(a, b, c))
        || (o2.abs() <= EPSILON && on_segment(a, b, d))
        || (o3.abs() <= EPSILON && on_segment(c, d, a))
        || (o4.abs() <= EPSILON && on_segment(c, d, b))
}

/// True when the loop has at least 3 vertices and no two non-adjacent edges meet.
pub fn is_simple(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        for j in (i + 1)..n {
            // Adjacent edges share a vertex by construction.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let c = points[j];
            let d = points[(j + 1) % n];
            if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

/// True when every turn of a CCW loop is a left turn (collinear allowed).
pub fn is_convex(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    (0..n).all(|i| orientation(points[i], points[(i + 1) % n], points[(i + 2) % n]) >= -EPSILON)
}

/// Triangulate a simple polygon. Each triangle is returned as CCW vertex indices.
fn triangulate(points: &[Vec2]) -> GameResult<Vec<[usize; 3]>> {
    let mut flat: Vec<f64> = Vec::with_capacity(points.len() * 2);
    for p in points {
        flat.push(p.x as f64);
        flat.push(p.y as f64);
    }
    let idx = earcut(&flat, &[], 2).map_err(|err| GameError::Decomposition {
        reason: format!("triangulation failed: {err:?}"),
    })?;

    let mut tris = Vec::with_capacity(idx.len() / 3);
    for t in idx.chunks_exact(3) {
        let (a, b, c) = (t[0], t[1], t[2]);
        if a >= points.len() || b >= points.len() || c >= points.len() {
            continue;
        }
        let o = orientation(points[a], points[b], points[c]);
        if o.abs() <= EPSILON {
            continue;
        }
        tris.push(if o > 0.0 { [a, b, c] } else { [a, c, b] });
    }
    Ok(tris)
}

/// Index of the directed edge `from → to` inside a polygon index loop.
fn find_edge(poly: &[usize], from: usize, to: usize) -> Option<usize> {
    let n = poly.len();
    (0..n).find(|&k| poly[k] == from && poly[(k + 1) % n] == to)
}

/// Join two CCW index loops across a shared edge `a → b` (in `p`) / `b → a` (in `q`).
fn join_across(p: &[usize], k: usize, q: &[usize], m: usize) -> Vec<usize> {
    let (np, nq) = (p.len(), q.len());
    let mut out = Vec::with_capacity(np + nq - 2);
    // Walk p from b all the way round to a.
    for s in 0..np {
        out.push(p[(k + 1 + s) % np]);
    }
    // Then q's vertices strictly between a and b.
    for s in 0..nq - 2 {
        out.push(q[(m + 2 + s) % nq]);
    }
    out
}

/// Split a simple CCW polygon into convex parts.
///
/// Triangulates, then greedily merges neighbours across shared diagonals while
/// the union stays convex (Hertel–Mehlhorn). Never produces more than four
/// times the optimal part count.
pub fn decompose_convex(points: &[Vec2]) -> GameResult<Vec<Vec<Vec2>>> {
    if is_convex(points) {
        return Ok(vec![points.to_vec()]);
    }

    let mut polys: Vec<Vec<usize>> = triangulate(points)?
        .into_iter()
        .map(|t| t.to_vec())
        .collect();
    if polys.is_empty() {
        return Err(GameError::Decomposition {
            reason: "triangulation produced no triangles".to_string(),
        });
    }

    let to_points = |poly: &[usize]| poly.iter().map(|&i| points[i]).collect::<Vec<Vec2>>();

    let mut merged_any = true;
    while merged_any {
        merged_any = false;
        'search: for i in 0..polys.len() {
            for j in (i + 1)..polys.len() {
                let n = polys[i].len();
                for k in 0..n {
                    let a = polys[i][k];
                    let b = polys[i][(k + 1) % n];
                    let Some(m) = find_edge(&polys[j], b, a) else {
                        continue;
                    };
                    let joined = join_across(&polys[i], k, &polys[j], m);
                    if is_convex(&to_points(&joined)) {
                        polys[i] = joined;
                        polys.swap_remove(j);
                        merged_any = true;
                        break 'search;
                    }
                }
            }
        }
    }

    Ok(polys.iter().map(|p| to_points(p)).collect())
}

/// Regular polygon centred on the origin, first vertex on +x.
pub fn regular_polygon(sides: usize, radius: f32) -> Vec<Vec2> {
    (0..sides)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / sides as f32;
            Vec2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Axis-aligned rectangle centred on the origin, CCW.
pub fn rectangle(w: f32, h: f32) -> Vec<Vec2> {
    let (hw, hh) = (w * 0.5, h * 0.5);
    vec![
        Vec2::new(-hw, -hh),
        Vec2::new(hw, -hh),
        Vec2::new(hw, hh),
        Vec2::new(-hw, hh),
    ]
}

/// Rotate `point` about `pivot` by `angle` radians.
pub fn rotate_about(point: Vec2, pivot: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    let d = point - pivot;
    pivot + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}

/// Map local-space parts into world space using a position and rotation.
pub fn place_parts(parts: &[Vec<Vec2>], position: Vec2, angle: f32) -> Vec<Vec<Vec2>> {
    let rot = Vec2::from_angle(angle);
    parts
        .iter()
        .map(|p| p.iter().map(|&v| position + rot.rotate(v)).collect())
        .collect()
}

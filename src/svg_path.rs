//! Traced SVG drawings → sampled vertex loops.
//!
//! Documents are parsed with `usvg`, which resolves relative commands,
//! shorthands, arcs and transforms into absolute line and Bézier segments.
//! Lines contribute their end points; curves are flattened into samples
//! roughly `sample` pixels apart. Coordinates stay in SVG space (y down);
//! callers flip them into world space.

use crate::error::{GameError, GameResult};
use bevy::prelude::*;
use usvg::tiny_skia_path::{PathSegment, Point};

/// Parse an SVG document.
pub fn parse_document(svg: &str) -> GameResult<usvg::Tree> {
    usvg::Tree::from_str(svg, &usvg::Options::default()).map_err(|e| GameError::SvgDocument {
        reason: e.to_string(),
    })
}

/// First path in document order, descending into groups.
fn first_path(group: &usvg::Group) -> Option<&usvg::Path> {
    group.children().iter().find_map(|node| match node {
        usvg::Node::Path(path) => Some(&**path),
        usvg::Node::Group(group) => first_path(group),
        _ => None,
    })
}

fn point(p: Point) -> Vec2 {
    Vec2::new(p.x, p.y)
}

fn cubic(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

fn quadratic(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
}

fn steps_for(control_polygon_len: f32, sample: f32) -> usize {
    ((control_polygon_len / sample.max(0.5)).ceil() as usize).clamp(1, 256)
}

fn finish(subpaths: &mut Vec<Vec<Vec2>>, current: &mut Vec<Vec2>) {
    if current.len() > 1 {
        subpaths.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Flatten absolute path segments into subpaths of sampled points.
pub fn flatten(segments: impl IntoIterator<Item = PathSegment>, sample: f32) -> Vec<Vec<Vec2>> {
    let mut subpaths = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    let mut pen = Vec2::ZERO;

    for segment in segments {
        match segment {
            PathSegment::MoveTo(p) => {
                finish(&mut subpaths, &mut current);
                pen = point(p);
                current.push(pen);
            }
            PathSegment::LineTo(p) => {
                pen = point(p);
                current.push(pen);
            }
            PathSegment::QuadTo(c, end) => {
                let (c, end) = (point(c), point(end));
                let steps = steps_for(pen.distance(c) + c.distance(end), sample);
                for s in 1..=steps {
                    current.push(quadratic(pen, c, end, s as f32 / steps as f32));
                }
                pen = end;
            }
            PathSegment::CubicTo(c1, c2, end) => {
                let (c1, c2, end) = (point(c1), point(c2), point(end));
                let len = pen.distance(c1) + c1.distance(c2) + c2.distance(end);
                let steps = steps_for(len, sample);
                for s in 1..=steps {
                    current.push(cubic(pen, c1, c2, end, s as f32 / steps as f32));
                }
                pen = end;
            }
            PathSegment::Close => finish(&mut subpaths, &mut current),
        }
    }
    finish(&mut subpaths, &mut current);
    subpaths
}

/// Subpaths of the document's first path, with its transforms applied.
pub fn first_path_subpaths(svg: &str, sample: f32) -> GameResult<Vec<Vec<Vec2>>> {
    let tree = parse_document(svg)?;
    let path = first_path(tree.root()).ok_or(GameError::MissingPathElement)?;
    let data = path
        .data()
        .clone()
        .transform(path.abs_transform())
        .ok_or(GameError::MissingPathElement)?;
    Ok(flatten(data.segments(), sample))
}

/// The subpath of the first path enclosing the largest area.
///
/// Traced drawings put the outer contour and any holes in one path; only the
/// outer contour becomes a body.
pub fn outline_from_svg(svg: &str, sample: f32) -> GameResult<Vec<Vec2>> {
    first_path_subpaths(svg, sample)?
        .into_iter()
        .max_by(|a, b| crate::geometry::area(a).total_cmp(&crate::geometry::area(b)))
        .ok_or(GameError::DegenerateOutline { vertex_count: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">{body}</svg>"#
        )
    }

    fn path(d: &str) -> String {
        doc(&format!(r#"<path d="{d}"/>"#))
    }

    #[test]
    fn absolute_and_relative_lines_agree() {
        let abs = first_path_subpaths(&path("M 10 10 L 20 10 L 20 20 Z"), 10.0).unwrap();
        let rel = first_path_subpaths(&path("m10,10 l10,0 0,10 z"), 10.0).unwrap();
        assert_eq!(abs, rel);
        assert_eq!(abs[0], vec![Vec2::new(10.0, 10.0), Vec2::new(20.0, 10.0), Vec2::new(20.0, 20.0)]);
    }

    #[test]
    fn horizontal_and_vertical_segments() {
        let paths = first_path_subpaths(&path("M10 10H40V30h-10v-10z"), 10.0).unwrap();
        assert_eq!(
            paths[0],
            vec![
                Vec2::new(10.0, 10.0),
                Vec2::new(40.0, 10.0),
                Vec2::new(40.0, 30.0),
                Vec2::new(30.0, 30.0),
                Vec2::new(30.0, 20.0),
            ]
        );
    }

    #[test]
    fn cubic_curve_is_sampled_and_ends_on_endpoint() {
        let paths = first_path_subpaths(&path("M0 0 C 0 100 100 100 100 0 Z"), 10.0).unwrap();
        let pts = &paths[0];
        assert!(pts.len() > 10, "curve should be flattened into many samples");
        assert!((pts[pts.len() - 1] - Vec2::new(100.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn arcs_are_flattened_onto_the_circle() {
        let paths = first_path_subpaths(&path("M50 100 A 50 50 0 0 1 150 100 Z"), 5.0).unwrap();
        let pts = &paths[0];
        assert!(pts.len() > 8);
        for p in pts {
            assert!((p.distance(Vec2::new(100.0, 100.0)) - 50.0).abs() < 0.5, "{p} is off the arc");
        }
    }

    #[test]
    fn group_transforms_are_applied() {
        let svg = doc(r#"<g transform="translate(10 20)"><path d="M0 0h50v50h-50z"/></g>"#);
        let paths = first_path_subpaths(&svg, 10.0).unwrap();
        assert_eq!(paths[0][0], Vec2::new(10.0, 20.0));
        assert_eq!(paths[0][2], Vec2::new(60.0, 70.0));
    }

    #[test]
    fn angle_bracket_inside_attribute_value() {
        let svg = doc(r#"<path data-note="a > b" d="M0 0L60 0L60 40L0 40Z"/>"#);
        assert_eq!(outline_from_svg(&svg, 10.0).unwrap().len(), 4);
    }

    #[test]
    fn missing_path_and_broken_documents_are_errors() {
        assert_eq!(outline_from_svg(&doc(""), 10.0), Err(GameError::MissingPathElement));
        assert!(matches!(
            outline_from_svg("not an svg", 10.0),
            Err(GameError::SvgDocument { .. })
        ));
    }

    #[test]
    fn outline_keeps_largest_subpath() {
        let outline = outline_from_svg(&path("M0 0h100v100h-100z M40 40h10v10h-10z"), 10.0).unwrap();
        assert_eq!(outline.len(), 4);
        assert_eq!(outline[1], Vec2::new(100.0, 0.0));
    }
}

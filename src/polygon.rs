//! Polygon bodies built from drawn outlines, and the mass → restitution model.
//!
//! Outlines arrive in screen space (either explicit vertices or a traced SVG
//! document). They are flipped into world space, simplified, validated, wound
//! CCW, split into convex parts and scaled before a compound collider is
//! assembled.

use crate::body::{BodyShape, OutlineSource};
use crate::constants::OUTLINE_DEDUP_MIN_DIST;
use crate::error::{GameError, GameResult};
use crate::geometry::{self, Aabb};
use crate::level::Viewport;
use crate::svg_path;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Maps body mass to restitution: heavier shapes bounce less.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestitutionModel {
    /// Restitution at (or below) `min_mass`. Clamped to `[0, 1]`.
    pub scale: f32,
    pub min_mass: f32,
    /// Restitution reaches 0 at this mass.
    pub max_mass: f32,
}

impl RestitutionModel {
    pub fn restitution_for(&self, mass: f32) -> f32 {
        let span = (self.max_mass - self.min_mass).max(f32::EPSILON);
        let clamped = mass.clamp(self.min_mass, self.max_mass);
        (1.0 - (clamped - self.min_mass) / span) * self.scale.clamp(0.0, 1.0)
    }
}

/// Resolve an outline source into a screen-space vertex loop.
pub fn resolve_outline(source: &OutlineSource, sample: f32) -> GameResult<Vec<Vec2>> {
    match source {
        OutlineSource::Vertices(points) => Ok(points.clone()),
        OutlineSource::Svg(document) => svg_path::outline_from_svg(document, sample),
    }
}

/// Build a compound body from a screen-space outline.
///
/// Without an explicit `position` the body stays where the outline was drawn:
/// its origin is the area centroid and `sprite_offset` records how far the
/// bounding-box centre sits from it. Vertices within `simplify` pixels of the
/// simplified outline are dropped before validation.
#[allow(clippy::too_many_arguments)]
pub fn polygon_from_outline(
    viewport: &Viewport,
    outline: &[Vec2],
    position: Option<Vec2>,
    scale: f32,
    mass: Option<f32>,
    density: f32,
    simplify: f32,
    model: &RestitutionModel,
) -> GameResult<BodyShape> {
    let world: Vec<Vec2> = outline.iter().map(|&p| viewport.to_world(p)).collect();
    let deduped = geometry::dedup_outline(&world, OUTLINE_DEDUP_MIN_DIST);
    let mut cleaned = geometry::simplify_loop(&deduped, simplify);
    if cleaned.len() < 3 || geometry::area(&cleaned) < 1e-3 {
        return Err(GameError::DegenerateOutline {
            vertex_count: cleaned.len(),
        });
    }
    if !geometry::is_simple(&cleaned) {
        return Err(GameError::SelfIntersectingOutline);
    }
    geometry::make_ccw(&mut cleaned);

    let pivot = geometry::centroid(&cleaned);
    let parts: Vec<Vec<Vec2>> = geometry::decompose_convex(&cleaned)?
        .into_iter()
        .map(|part| part.into_iter().map(|v| pivot + (v - pivot) * scale).collect())
        .collect();

    let centroid = geometry::compound_centroid(&parts);
    let local: Vec<Vec<Vec2>> = parts
        .iter()
        .map(|part| part.iter().map(|&v| v - centroid).collect())
        .collect();

    let shapes: Vec<(Vec2, f32, Collider)> = local
        .iter()
        .filter_map(|part| Collider::convex_hull(part))
        .map(|collider| (Vec2::ZERO, 0.0, collider))
        .collect();
    if shapes.is_empty() {
        return Err(GameError::Decomposition {
            reason: "no convex part produced a collider".to_string(),
        });
    }

    let all: Vec<Vec2> = parts.iter().flatten().copied().collect();
    let bounds = Aabb::from_points(&all).ok_or(GameError::DegenerateOutline { vertex_count: 0 })?;
    let area: f32 = local.iter().map(|p| geometry::area(p)).sum();
    let mass = mass.unwrap_or(area * density);

    Ok(BodyShape {
        position: position.map_or(centroid, |p| viewport.to_world(p)),
        parts: local,
        collider: Collider::compound(shapes),
        area,
        sprite_offset: bounds.center() - centroid,
        restitution: Some(model.restitution_for(mass)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        BODY_DENSITY, MAX_RESTITUTION_MASS, MIN_RESTITUTION_MASS, OUTLINE_SIMPLIFY_TOLERANCE,
        RESTITUTION_SCALE,
    };

    fn model() -> RestitutionModel {
        RestitutionModel {
            scale: RESTITUTION_SCALE,
            min_mass: MIN_RESTITUTION_MASS,
            max_mass: MAX_RESTITUTION_MASS,
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn build(outline: &[Vec2], position: Option<Vec2>, scale: f32) -> GameResult<BodyShape> {
        polygon_from_outline(
            &viewport(),
            outline,
            position,
            scale,
            None,
            BODY_DENSITY,
            OUTLINE_SIMPLIFY_TOLERANCE,
            &model(),
        )
    }

    /// A "U" drawn in screen space.
    fn cup() -> Vec<Vec2> {
        vec![
            Vec2::new(300.0, 200.0),
            Vec2::new(320.0, 200.0),
            Vec2::new(320.0, 280.0),
            Vec2::new(380.0, 280.0),
            Vec2::new(380.0, 200.0),
            Vec2::new(400.0, 200.0),
            Vec2::new(400.0, 300.0),
            Vec2::new(300.0, 300.0),
        ]
    }

    #[test]
    fn restitution_endpoints() {
        assert!((model().restitution_for(1.0) - 0.6).abs() < 1e-6);
        assert!(model().restitution_for(80.0).abs() < 1e-6);
        assert!((model().restitution_for(0.1) - 0.6).abs() < 1e-6);
        assert_eq!(model().restitution_for(500.0), 0.0);
    }

    #[test]
    fn restitution_is_non_increasing_in_mass() {
        let mut last = f32::INFINITY;
        for m in 1..=80 {
            let r = model().restitution_for(m as f32);
            assert!(r <= last, "restitution rose at mass {m}");
            last = r;
        }
    }

    #[test]
    fn restitution_scale_is_clamped() {
        let loud = RestitutionModel { scale: 3.0, ..model() };
        assert_eq!(loud.restitution_for(1.0), 1.0);
    }

    #[test]
    fn unplaced_outline_stays_where_drawn() {
        let outline = cup();
        let shape = build(&outline, None, 1.0).unwrap();
        let world: Vec<Vec2> = outline.iter().map(|&p| viewport().to_world(p)).collect();
        let bounds = Aabb::from_points(&world).unwrap();
        assert!(bounds.contains(shape.position));
        assert!(shape.parts.len() >= 2, "concave outline must split");
        for part in &shape.parts {
            assert!(geometry::is_convex(part));
        }
        assert!((shape.area - 5200.0).abs() < 0.5);
    }

    #[test]
    fn explicit_position_wins() {
        let shape = build(&cup(), Some(Vec2::new(10.0, 20.0)), 1.0).unwrap();
        assert_eq!(shape.position, viewport().to_world(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn scale_shrinks_area_quadratically() {
        let full = build(&cup(), None, 1.0).unwrap();
        let half = build(&cup(), None, 0.5).unwrap();
        assert!((half.area - full.area * 0.25).abs() < 0.5);
    }

    #[test]
    fn restitution_follows_mass() {
        // 5200 px² × 0.001 = 5.2 mass units.
        let shape = build(&cup(), None, 1.0).unwrap();
        let expected = model().restitution_for(5.2);
        assert!((shape.restitution.unwrap() - expected).abs() < 1e-4);
    }

    #[test]
    fn clockwise_input_is_accepted() {
        let mut outline = cup();
        outline.reverse();
        assert!(build(&outline, None, 1.0).is_ok());
    }

    #[test]
    fn bow_tie_is_rejected() {
        let outline = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(0.0, 100.0),
        ];
        assert!(matches!(
            build(&outline, None, 1.0),
            Err(GameError::SelfIntersectingOutline)
        ));
    }

    #[test]
    fn collinear_outline_is_degenerate() {
        let outline = vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        assert!(matches!(
            build(&outline, None, 1.0),
            Err(GameError::DegenerateOutline { .. })
        ));
    }

    #[test]
    fn svg_source_is_flattened() {
        let source = OutlineSource::Svg(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><path d="M0 0h50v50h-50z"/></svg>"#
                .to_string(),
        );
        assert_eq!(resolve_outline(&source, 10.0).unwrap().len(), 4);
    }

    #[test]
    fn densely_traced_outline_is_simplified() {
        // A 200 px disc traced with one vertex per degree.
        let traced: Vec<Vec2> = (0..360)
            .map(|d| {
                let a = (d as f32).to_radians();
                Vec2::new(400.0 + 100.0 * a.cos(), 300.0 + 100.0 * a.sin())
            })
            .collect();
        let shape = build(&traced, None, 1.0).unwrap();
        let vertices: usize = shape.parts.iter().map(Vec::len).sum();
        assert!(vertices < 120, "{vertices} vertices survived simplification");
        let disc = std::f32::consts::PI * 100.0 * 100.0;
        assert!((shape.area - disc).abs() < 0.03 * disc);
    }
}

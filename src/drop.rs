//! Drop pipeline: turn a supplied outline (or a debug test block) into the
//! single player-dropped body.
//!
//! Requests carry the level generation they were issued under. A request that
//! resolves after a level change is discarded. The footprint check reads the
//! world when the request is handled, not when it was made.

use crate::body::{
    build_shape, penetration_depth, spawn_body, BodyDescriptor, BodyRole, LevelBody, Motion,
    OutlineSource, PhysicsOptions, ShapeSpec, Style,
};
use crate::config::GameConfig;
use crate::level::Viewport;
use crate::lifecycle::LevelManager;
use bevy::prelude::*;
use bevy_rapier2d::prelude::Collider;
use serde::Deserialize;

type SolidBodies<'w, 's> =
    Query<'w, 's, (Entity, &'static BodyRole, &'static Transform, &'static Collider), With<LevelBody>>;

/// Color of the captured drawing; decides how the dropped body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    #[default]
    Yellow,
    Blue,
    #[serde(other)]
    Unknown,
}

impl ColorTag {
    pub fn motion(self) -> Option<Motion> {
        match self {
            ColorTag::Yellow => Some(Motion::Dynamic),
            ColorTag::Blue => Some(Motion::Static),
            ColorTag::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropShape {
    /// Screen-space outline; scaled by `drop_outline_scale`.
    Outline(Vec<Vec2>),
    TestBlock { w: f32, h: f32 },
}

/// Ask for a body to be dropped at `position` (screen space).
#[derive(Message, Debug, Clone, PartialEq)]
pub struct DropRequest {
    pub shape: DropShape,
    pub position: Vec2,
    pub color: ColorTag,
    /// [`LevelManager::generation`] when the request was issued.
    pub generation: u64,
}

/// What happened to a drop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Committed(Entity),
    /// The footprint overlapped a solid body.
    Rejected,
    /// Issued under a previous level.
    Stale,
    /// The shape could not be built.
    Invalid,
}

fn descriptor_for(request: &DropRequest, config: &GameConfig) -> BodyDescriptor {
    let descriptor = match &request.shape {
        DropShape::Outline(points) => BodyDescriptor::new(
            Some(request.position),
            ShapeSpec::Outline {
                source: OutlineSource::Vertices(points.clone()),
                sample: config.outline_sample_density,
            },
        )
        .with_scale(config.drop_outline_scale),
        DropShape::TestBlock { w, h } => {
            BodyDescriptor::rect(request.position.x, request.position.y, *w, *h)
        }
    };
    descriptor.with_style(Style::outlined())
}

/// Resolve drop requests against the current world.
pub fn drop_system(
    mut commands: Commands,
    mut requests: MessageReader<DropRequest>,
    mut manager: ResMut<LevelManager>,
    viewport: Res<Viewport>,
    config: Res<GameConfig>,
    bodies: SolidBodies,
) {
    for request in requests.read() {
        let outcome = resolve_drop(&mut commands, &mut manager, &viewport, &config, &bodies, request);
        match outcome {
            DropOutcome::Committed(entity) => info!("Dropped body {:?}", entity),
            DropOutcome::Rejected => info!("Drop rejected: overlaps level geometry"),
            DropOutcome::Stale => info!("Drop discarded: level changed"),
            DropOutcome::Invalid => {}
        }
    }
}

fn resolve_drop(
    commands: &mut Commands,
    manager: &mut LevelManager,
    viewport: &Viewport,
    config: &GameConfig,
    bodies: &SolidBodies,
    request: &DropRequest,
) -> DropOutcome {
    if request.generation != manager.generation {
        return DropOutcome::Stale;
    }
    let Some(motion) = request.color.motion() else {
        warn!("Drop ignored: unknown color tag");
        return DropOutcome::Invalid;
    };
    let options = PhysicsOptions {
        motion,
        ..PhysicsOptions::fixed(BodyRole::Dropped)
    };
    let descriptor = descriptor_for(request, config);
    let Some(shape) = build_shape(viewport, config, &descriptor, &options) else {
        return DropOutcome::Invalid;
    };

    let at = Transform::from_translation(shape.position.extend(0.0));
    let blocked = bodies.iter().any(|(entity, role, transform, collider)| {
        Some(entity) != manager.dropped
            && !matches!(role, BodyRole::Sensor(_))
            && penetration_depth(&shape.collider, &at, collider, transform).is_some()
    });
    if blocked {
        return DropOutcome::Rejected;
    }

    if let Some(previous) = manager.dropped.take() {
        if let Ok(mut entity) = commands.get_entity(previous) {
            entity.despawn();
        }
        manager.drawables.retain(|&e| e != previous);
    }
    let entity = spawn_body(commands, config, shape, &descriptor, &options);
    manager.dropped = Some(entity);
    manager.drawables.push(entity);
    DropOutcome::Committed(entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Tagged {
        color: ColorTag,
    }

    #[test]
    fn color_tags_parse_lowercase() {
        let tag = |s: &str| serde_json::from_str::<Tagged>(s).unwrap().color;
        assert_eq!(tag(r#"{"color":"yellow"}"#), ColorTag::Yellow);
        assert_eq!(tag(r#"{"color":"blue"}"#), ColorTag::Blue);
        assert_eq!(tag(r#"{"color":"green"}"#), ColorTag::Unknown);
    }

    #[test]
    fn color_decides_motion() {
        assert_eq!(ColorTag::Yellow.motion(), Some(Motion::Dynamic));
        assert_eq!(ColorTag::Blue.motion(), Some(Motion::Static));
        assert_eq!(ColorTag::Unknown.motion(), None);
    }

    #[test]
    fn outline_drops_are_scaled() {
        let request = DropRequest {
            shape: DropShape::Outline(vec![Vec2::ZERO, Vec2::X, Vec2::ONE]),
            position: Vec2::new(5.0, 6.0),
            color: ColorTag::Yellow,
            generation: 1,
        };
        let config = GameConfig::default();
        let descriptor = descriptor_for(&request, &config);
        assert_eq!(descriptor.scale, config.drop_outline_scale);
        assert_eq!(descriptor.position, Some(Vec2::new(5.0, 6.0)));
    }
}

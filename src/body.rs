//! Puzzle bodies: descriptors, roles and the one construction path that turns
//! them into Rapier entities.
//!
//! A body is described by a [`BodyDescriptor`] (where it is, what shape, how it
//! looks) and [`PhysicsOptions`] (how it moves and which [`BodyRole`] it plays).
//! [`build_shape`] picks the construction strategy from the [`ShapeSpec`]
//! variant; [`spawn_body`] adds the result to the world. Construction can fail
//! (a degenerate drawing); that is logged and yields `None`, never a panic.
//!
//! Removal is always explicit: despawn the entity. Level teardown despawns
//! every [`LevelBody`].

use crate::config::GameConfig;
use crate::constants::{CIRCLE_SEGMENTS, OVERLAP_TOLERANCE};
use crate::geometry::{self, rotate_about};
use crate::hazard::{self, SpikeArc};
use crate::level::Viewport;
use crate::polygon;
use bevy::prelude::*;
use bevy_rapier2d::parry::query;
use bevy_rapier2d::prelude::*;

/// Converts a Bevy transform to a Rapier isometry. Verbatim copy of
/// `bevy_rapier2d::utils::transform_to_iso`, which is `pub(crate)` upstream.
fn transform_to_iso(transform: &Transform) -> bevy_rapier2d::rapier::math::Isometry<bevy_rapier2d::rapier::math::Real> {
    use bevy::math::Vec3Swizzles;
    bevy_rapier2d::rapier::math::Isometry::new(
        transform.translation.xy().into(),
        transform.rotation.to_scaled_axis().z,
    )
}

// ── Roles ─────────────────────────────────────────────────────────────────────

/// What a sensor reports to the collision evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorRole {
    /// Touching two of these at once wins a bridge level.
    Win,
    /// Touching any of these fails a bridge level.
    Fail,
    /// Pressing on this with enough mass wins a squash level.
    Crush,
}

/// Which hazard of a level a body is; jamming one leaves the others spinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardSide {
    Left,
    Right,
    Centre,
}

/// The part a body plays in its level. Resolved once at construction and
/// matched on by the collision evaluator.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRole {
    Terrain,
    Sensor(SensorRole),
    Hazard(HazardSide),
    ButtonBase,
    ButtonTop,
    Character,
    /// Loose level furniture such as a tethered weight.
    Prop,
    /// The player's drawing or a debug test block.
    Dropped,
}

// ── Descriptors ───────────────────────────────────────────────────────────────

/// How a rectangle's position is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Center,
    /// Position is the top-left corner in screen space.
    Corner,
}

/// Where an outline's vertices come from.
#[derive(Debug, Clone, PartialEq)]
pub enum OutlineSource {
    /// Explicit vertex loop in screen space.
    Vertices(Vec<Vec2>),
    /// SVG document in screen space; its first path is traced.
    Svg(String),
}

/// Exactly one of these determines a body's physical shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeSpec {
    Rect { w: f32, h: f32, anchor: Anchor },
    Circle { r: f32 },
    Outline { source: OutlineSource, sample: f32 },
    Hazard { r: f32, spikes: SpikeArc },
}

/// Fill/stroke styling for the draw pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub weight: f32,
}

impl Style {
    /// White fill with a black outline, used for terrain and drawings.
    pub fn outlined() -> Self {
        Self {
            fill: Some(Color::WHITE),
            stroke: Some(Color::BLACK),
            weight: 2.0,
        }
    }

    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            weight: 0.0,
        }
    }
}

/// Called with `(self, other)` once per frame for every body that touched
/// `self` while `other` carries this trigger.
pub type ContactTrigger = fn(&mut Commands, Entity, Entity);

/// Behaviour a body imposes on whatever collides with it.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ContactEffect {
    /// Impulse applied to the colliding body once per contact frame.
    pub force: Option<Vec2>,
    pub trigger: Option<ContactTrigger>,
}

/// Semantic attributes of a placed object. Positions are in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDescriptor {
    /// Centre (or corner, for corner-anchored rectangles). Outlines without a
    /// position stay where they were drawn.
    pub position: Option<Vec2>,
    pub shape: ShapeSpec,
    pub style: Option<Style>,
    /// Sprite offset relative to the body origin.
    pub offset: Vec2,
    pub scale: f32,
    /// Asset path of an optional sprite drawn over the body.
    pub sprite: Option<String>,
    pub effect: Option<ContactEffectSpec>,
}

/// Descriptor-side mirror of [`ContactEffect`] (function pointers compare by address).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEffectSpec {
    pub force: Option<Vec2>,
    pub trigger: Option<ContactTrigger>,
}

impl BodyDescriptor {
    pub fn new(position: Option<Vec2>, shape: ShapeSpec) -> Self {
        Self {
            position,
            shape,
            style: None,
            offset: Vec2::ZERO,
            scale: 1.0,
            sprite: None,
            effect: None,
        }
    }

    pub fn rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(
            Some(Vec2::new(x, y)),
            ShapeSpec::Rect {
                w,
                h,
                anchor: Anchor::Center,
            },
        )
    }

    pub fn corner_rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(
            Some(Vec2::new(x, y)),
            ShapeSpec::Rect {
                w,
                h,
                anchor: Anchor::Corner,
            },
        )
    }

    pub fn circle(x: f32, y: f32, r: f32) -> Self {
        Self::new(Some(Vec2::new(x, y)), ShapeSpec::Circle { r })
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_sprite(mut self, path: impl Into<String>) -> Self {
        self.sprite = Some(path.into());
        self
    }

    pub fn with_effect(mut self, effect: ContactEffectSpec) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// How a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    #[default]
    Static,
    Dynamic,
    /// Moved by game logic (spinning hazards, button tops).
    Kinematic,
}

/// Engine-facing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsOptions {
    pub motion: Motion,
    /// Overrides `area × density`.
    pub mass: Option<f32>,
    /// Overrides the restitution model (outlines) or the default of 0.
    pub restitution: Option<f32>,
    pub friction: Option<f32>,
    pub sensor: bool,
    pub role: BodyRole,
}

impl PhysicsOptions {
    pub fn fixed(role: BodyRole) -> Self {
        Self {
            motion: Motion::Static,
            mass: None,
            restitution: None,
            friction: None,
            sensor: false,
            role,
        }
    }

    pub fn dynamic(role: BodyRole) -> Self {
        Self {
            motion: Motion::Dynamic,
            ..Self::fixed(role)
        }
    }

    pub fn kinematic(role: BodyRole) -> Self {
        Self {
            motion: Motion::Kinematic,
            ..Self::fixed(role)
        }
    }

    pub fn sensor(role: SensorRole) -> Self {
        Self {
            sensor: true,
            ..Self::fixed(BodyRole::Sensor(role))
        }
    }
}

// ── Components ────────────────────────────────────────────────────────────────

/// Marker for every entity owned by the current level.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelBody;

/// Convex parts in body-local space (y up), used for drawing.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ShapeParts(pub Vec<Vec<Vec2>>);

impl ShapeParts {
    /// Parts placed at the given transform.
    pub fn world(&self, transform: &Transform) -> Vec<Vec<Vec2>> {
        geometry::place_parts(&self.0, transform.translation.truncate(), body_angle(transform))
    }
}

/// Mass used by the collision evaluator (matches the collider's mass).
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BodyMass(pub f32);

/// Draw-time decoration.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct BodyVisual {
    pub style: Option<Style>,
    pub sprite: Option<String>,
    /// Sprite offset from the body origin (body-local, y up).
    pub sprite_offset: Vec2,
    pub scale: f32,
}

/// Bodies that started touching this one since the last effects pass.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct CollisionLog(pub Vec<Entity>);

impl CollisionLog {
    pub fn record(&mut self, other: Entity) {
        if !self.0.contains(&other) {
            self.0.push(other);
        }
    }
}

/// Constraint handles owned by this body.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct BodyConstraints(pub Vec<ConstraintHandle>);

// ── Construction ──────────────────────────────────────────────────────────────

/// A constructed shape, ready to spawn.
#[derive(Debug, Clone)]
pub struct BodyShape {
    /// World-space body origin.
    pub position: Vec2,
    pub parts: Vec<Vec<Vec2>>,
    pub collider: Collider,
    pub area: f32,
    pub sprite_offset: Vec2,
    /// Restitution derived during construction (outline bodies).
    pub restitution: Option<f32>,
}

impl BodyShape {
    /// A single convex part centred on `position`.
    fn convex(position: Vec2, part: Vec<Vec2>, collider: Collider) -> Self {
        Self {
            position,
            area: geometry::area(&part),
            parts: vec![part],
            collider,
            sprite_offset: Vec2::ZERO,
            restitution: None,
        }
    }
}

/// Rectangle; corner-anchored positions are converted to the centre first.
pub fn rectangle(viewport: &Viewport, position: Vec2, w: f32, h: f32, anchor: Anchor) -> BodyShape {
    let center = match anchor {
        Anchor::Center => position,
        Anchor::Corner => position + Vec2::new(w, h) * 0.5,
    };
    BodyShape::convex(
        viewport.to_world(center),
        geometry::rectangle(w, h),
        Collider::cuboid(w * 0.5, h * 0.5),
    )
}

pub fn circle(viewport: &Viewport, position: Vec2, r: f32) -> BodyShape {
    BodyShape::convex(
        viewport.to_world(position),
        geometry::regular_polygon(CIRCLE_SEGMENTS, r),
        Collider::ball(r),
    )
}

/// Build the shape for a descriptor. `None` means construction failed and was logged.
pub fn build_shape(
    viewport: &Viewport,
    config: &GameConfig,
    descriptor: &BodyDescriptor,
    options: &PhysicsOptions,
) -> Option<BodyShape> {
    let position = descriptor.position;
    match &descriptor.shape {
        ShapeSpec::Rect { w, h, anchor } => Some(rectangle(
            viewport,
            position.unwrap_or(viewport.center()),
            w * descriptor.scale,
            h * descriptor.scale,
            *anchor,
        )),
        ShapeSpec::Circle { r } => Some(circle(
            viewport,
            position.unwrap_or(viewport.center()),
            r * descriptor.scale,
        )),
        ShapeSpec::Outline { source, sample } => {
            let result = polygon::resolve_outline(source, *sample).and_then(|outline| {
                polygon::polygon_from_outline(
                    viewport,
                    &outline,
                    position,
                    descriptor.scale,
                    options.mass,
                    config.body_density,
                    config.outline_simplify_tolerance,
                    &config.restitution_model(),
                )
            });
            match result {
                Ok(shape) => Some(shape),
                Err(err) => {
                    warn!("Outline body not created: {}", err);
                    None
                }
            }
        }
        ShapeSpec::Hazard { r, spikes } => {
            let center = viewport.to_world(position.unwrap_or(viewport.center()));
            hazard::hazard_shape(center, r * descriptor.scale, *spikes)
        }
    }
}

/// Add a constructed shape to the world. Returns the new entity.
pub fn spawn_body(
    commands: &mut Commands,
    config: &GameConfig,
    shape: BodyShape,
    descriptor: &BodyDescriptor,
    options: &PhysicsOptions,
) -> Entity {
    let mass = options.mass.unwrap_or(shape.area * config.body_density);
    let restitution = options.restitution.or(shape.restitution).unwrap_or(0.0);
    let friction = options.friction.unwrap_or(config.default_friction);
    let rigid_body = match options.motion {
        Motion::Static => RigidBody::Fixed,
        Motion::Dynamic => RigidBody::Dynamic,
        Motion::Kinematic => RigidBody::KinematicPositionBased,
    };

    let mut entity = commands.spawn((
        (
            Transform::from_translation(shape.position.extend(0.0)),
            LevelBody,
            options.role,
            ShapeParts(shape.parts),
            BodyMass(mass),
            BodyVisual {
                style: descriptor.style,
                sprite: descriptor.sprite.clone(),
                sprite_offset: shape.sprite_offset + descriptor.offset,
                scale: descriptor.scale,
            },
            CollisionLog::default(),
            BodyConstraints::default(),
        ),
        (
            rigid_body,
            shape.collider,
            ColliderMassProperties::Mass(mass),
            Restitution::coefficient(restitution),
            Friction::coefficient(friction),
            Velocity::zero(),
            ExternalImpulse::default(),
            ActiveEvents::COLLISION_EVENTS,
            // Kinematic hazards and button tops must still report contacts with terrain.
            ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC,
        ),
    ));
    if options.sensor {
        entity.insert(Sensor);
    }
    if let Some(effect) = descriptor.effect {
        entity.insert(ContactEffect {
            force: effect.force,
            trigger: effect.trigger,
        });
    }
    entity.id()
}

/// Build and spawn in one step; `None` when construction failed.
pub fn spawn_descriptor(
    commands: &mut Commands,
    viewport: &Viewport,
    config: &GameConfig,
    descriptor: &BodyDescriptor,
    options: &PhysicsOptions,
) -> Option<Entity> {
    let shape = build_shape(viewport, config, descriptor, options)?;
    Some(spawn_body(commands, config, shape, descriptor, options))
}

// ── Overlap ───────────────────────────────────────────────────────────────────

/// How deep two placed colliders interpenetrate, from the engine's contact
/// query. `None` when they are apart or only touching.
pub fn penetration_depth(a: &Collider, a_at: &Transform, b: &Collider, b_at: &Transform) -> Option<f32> {
    let contact = query::contact(
        &transform_to_iso(a_at),
        a.raw.as_ref(),
        &transform_to_iso(b_at),
        b.raw.as_ref(),
        0.0,
    )
    .ok()
    .flatten()?;
    (contact.dist < -OVERLAP_TOLERANCE).then_some(-contact.dist)
}

// ── Rotation ──────────────────────────────────────────────────────────────────

/// Current orientation in radians.
pub fn body_angle(transform: &Transform) -> f32 {
    transform.rotation.to_euler(EulerRot::XYZ).2
}

/// Rotate by `delta`. With a pivot, the position orbits the pivot by the same delta.
pub fn rotate_by(transform: &mut Transform, delta: f32, pivot: Option<Vec2>) {
    if let Some(pivot) = pivot {
        let moved = rotate_about(transform.translation.truncate(), pivot, delta);
        transform.translation.x = moved.x;
        transform.translation.y = moved.y;
    }
    transform.rotate_z(delta);
}

/// Rotate to an absolute `angle`, orbiting `pivot` by the implied delta.
pub fn rotate_to(transform: &mut Transform, angle: f32, pivot: Option<Vec2>) {
    let delta = angle - body_angle(transform);
    rotate_by(transform, delta, pivot);
}

// ── Per-frame contact effects ─────────────────────────────────────────────────

/// Record every collision start on both participants' [`CollisionLog`].
pub fn record_collisions_system(
    mut collision_events: MessageReader<CollisionEvent>,
    mut logs: Query<&mut CollisionLog>,
) {
    for event in collision_events.read() {
        let (e1, e2) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2),
            CollisionEvent::Stopped(..) => continue,
        };
        if let Ok(mut log) = logs.get_mut(e1) {
            log.record(e2);
        }
        if let Ok(mut log) = logs.get_mut(e2) {
            log.record(e1);
        }
    }
}

/// Apply the force and trigger of every body this body touched, then clear the log.
pub fn apply_contact_effects_system(
    mut commands: Commands,
    mut bodies: Query<(Entity, &mut CollisionLog, Option<&mut ExternalImpulse>)>,
    effects: Query<&ContactEffect>,
) {
    for (entity, mut log, mut impulse) in bodies.iter_mut() {
        for other in log.0.drain(..) {
            let Ok(effect) = effects.get(other) else {
                continue;
            };
            if let (Some(force), Some(impulse)) = (effect.force, impulse.as_mut()) {
                impulse.impulse += force;
            }
            if let Some(trigger) = effect.trigger {
                trigger(&mut commands, entity, other);
            }
        }
    }
}

// ── Constraints ───────────────────────────────────────────────────────────────

/// Handle to a constraint; release it with [`release_constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle {
    /// Entity carrying the joint and its [`ConstraintLink`].
    pub link: Entity,
    /// Fixed body spawned for a world-point target.
    pub anchor: Option<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    Spring {
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    },
    Rope {
        max_length: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintOptions {
    pub kind: ConstraintKind,
    /// Anchor on the constrained body (body-local).
    pub anchor_a: Vec2,
    /// Anchor on the other body (body-local) or offset from the world point.
    pub anchor_b: Vec2,
    pub visible: bool,
    pub color: Color,
    /// Draw this sprite along the constraint instead of a line.
    pub sprite: Option<String>,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            kind: ConstraintKind::Rope { max_length: 0.0 },
            anchor_a: Vec2::ZERO,
            anchor_b: Vec2::ZERO,
            visible: true,
            color: Color::srgb(1.0, 0.0, 1.0),
            sprite: None,
        }
    }
}

/// What the far end of a constraint is attached to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintTarget {
    Body(Entity),
    /// Fixed world point (world space).
    Point(Vec2),
}

/// Lives on the constraint entity; read by the draw pass.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ConstraintLink {
    pub body: Entity,
    pub target: ConstraintTarget,
    /// Fixed anchor body spawned for world-point targets.
    pub anchor_body: Option<Entity>,
    pub options: ConstraintOptions,
}

fn joint_data(kind: ConstraintKind, anchor_a: Vec2, anchor_b: Vec2) -> TypedJoint {
    match kind {
        ConstraintKind::Spring {
            rest_length,
            stiffness,
            damping,
        } => SpringJointBuilder::new(rest_length, stiffness, damping)
            .local_anchor1(anchor_b)
            .local_anchor2(anchor_a)
            .build()
            .into(),
        ConstraintKind::Rope { max_length } => RopeJointBuilder::new(max_length)
            .local_anchor1(anchor_b)
            .local_anchor2(anchor_a)
            .build()
            .into(),
    }
}

/// Constrain `body` to another body, or to a fixed world point.
///
/// `target = None` pins the body where it currently is (`body_position`).
/// The handle is recorded in `constraints`, which must be the body's own
/// [`BodyConstraints`]. The constraint lives on a child entity of `body`, so
/// despawning the body releases it too.
pub fn constrain_to(
    commands: &mut Commands,
    constraints: &mut BodyConstraints,
    body: Entity,
    body_position: Vec2,
    target: Option<ConstraintTarget>,
    options: ConstraintOptions,
) -> ConstraintHandle {
    let target = target.unwrap_or(ConstraintTarget::Point(body_position));
    let (parent, anchor_body) = match target {
        ConstraintTarget::Body(other) => (other, None),
        ConstraintTarget::Point(point) => {
            let anchor = commands
                .spawn((
                    Transform::from_translation(point.extend(0.0)),
                    LevelBody,
                    RigidBody::Fixed,
                ))
                .id();
            (anchor, Some(anchor))
        }
    };
    let joint = joint_data(options.kind, options.anchor_a, options.anchor_b);
    let link = commands
        .spawn((
            ChildOf(body),
            ImpulseJoint::new(parent, joint),
            ConstraintLink {
                body,
                target,
                anchor_body,
                options,
            },
        ))
        .id();
    let handle = ConstraintHandle {
        link,
        anchor: anchor_body,
    };
    constraints.0.push(handle);
    handle
}

/// Release a constraint owned by `constraints`, despawning its joint and any
/// anchor body it spawned. Unknown handles are ignored.
pub fn release_constraint(commands: &mut Commands, constraints: &mut BodyConstraints, handle: ConstraintHandle) {
    let Some(idx) = constraints.0.iter().position(|h| h.link == handle.link) else {
        return;
    };
    let stored = constraints.0.remove(idx);
    if let Ok(mut link) = commands.get_entity(stored.link) {
        link.despawn();
    }
    if let Some(anchor) = stored.anchor {
        if let Ok(mut anchor) = commands.get_entity(anchor) {
            anchor.despawn();
        }
    }
}

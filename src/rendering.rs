//! Drawing: filled meshes, gizmo outlines, sprites, constraints and the HUD.
//!
//! ## Layer Model
//!
//! | Layer             | Technology | Default | Controlled by          |
//! |-------------------|------------|---------|------------------------|
//! | Body fills        | `Mesh2d`   | ON      | `Style::fill`          |
//! | Body outlines     | Gizmos     | ON      | `Style::stroke`        |
//! | Sensor outlines   | Gizmos     | OFF     | `show_sensors`         |
//! | Part outlines     | Gizmos     | OFF     | `show_parts`           |
//! | Sprites           | `Sprite`   | ON      | `BodyVisual::sprite`   |
//! | Constraints       | Gizmos / `Sprite` | ON | `ConstraintOptions` |
//! | Placement hint    | Gizmos     | level   | `LevelManager::hint`   |
//! | Level HUD         | Bevy UI    | always  | —                      |
//!
//! Bodies that failed to build were never spawned, so there is nothing to
//! skip here.

use crate::body::{BodyRole, BodyVisual, ConstraintLink, ConstraintTarget, ShapeParts};
use crate::geometry::Aabb;
use crate::level::Viewport;
use crate::lifecycle::LevelManager;
use crate::rules::GameState;
use bevy::ecs::query::QueryFilter;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};

pub struct DrawingPlugin;

impl Plugin for DrawingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayState>()
            .add_systems(Startup, (setup_camera, setup_level_hud))
            .add_systems(
                Update,
                (
                    attach_body_visuals_system,
                    attach_constraint_sprites_system,
                    orient_constraint_sprites_system,
                    draw_bodies_system,
                    draw_constraints_system,
                    draw_hint_system,
                    level_hud_system,
                ),
            );
    }
}

/// Debug overlay toggles.
#[derive(Resource, Clone, Debug, Default)]
pub struct OverlayState {
    /// Outline invisible sensors.
    pub show_sensors: bool,
    /// Outline every convex part, including unstyled bodies.
    pub show_parts: bool,
}

/// Marker for the level HUD text node.
#[derive(Component)]
pub struct LevelHud;

/// Sprite drawn along a constraint; follows the link it names.
#[derive(Component, Debug, Clone, Copy)]
pub struct ConstraintSprite {
    pub link: Entity,
}

/// Setup camera for 2D rendering
pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

pub fn setup_level_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                top: Val::Px(10.0),
                ..default()
            },
            LevelHud,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(Color::BLACK),
            ));
        });
}

/// HUD line for the current level and state.
pub fn hud_line(manager: &LevelManager, state: GameState) -> String {
    let status = match state {
        GameState::Running => "",
        GameState::Win => " (solved! N for next level)",
        GameState::Failure => " (failed, Space to retry)",
    };
    format!("Level {}: {}{}", manager.current.index(), manager.current, status)
}

pub fn level_hud_system(
    manager: Res<LevelManager>,
    state: Res<State<GameState>>,
    parent_query: Query<&Children, With<LevelHud>>,
    mut text_query: Query<&mut Text>,
) {
    if !manager.is_changed() && !state.is_changed() {
        return;
    }
    for children in parent_query.iter() {
        for child in children.iter() {
            if let Ok(mut text) = text_query.get_mut(child) {
                *text = Text::new(hud_line(&manager, *state.get()));
            }
        }
    }
}

/// Fan-triangulate every convex part into one [`Mesh`].
pub fn filled_parts_mesh(parts: &[Vec<Vec2>]) -> Mesh {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    for part in parts.iter().filter(|p| p.len() >= 3) {
        let base = positions.len() as u32;
        positions.extend(part.iter().map(|v| [v.x, v.y, 0.0]));
        for i in 1..(part.len() as u32 - 1) {
            indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }
    let normals: Vec<[f32; 3]> = vec![[0.0, 0.0, 1.0]; positions.len()];
    let uvs: Vec<[f32; 2]> = positions
        .iter()
        .map(|p| [(p[0] / 100.0) + 0.5, (p[1] / 100.0) + 0.5])
        .collect();

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Give newly spawned bodies their fill mesh and sprite.
pub fn attach_body_visuals_system(
    mut commands: Commands,
    query: Query<(Entity, &ShapeParts, &BodyVisual), Added<BodyVisual>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    asset_server: Res<AssetServer>,
) {
    for (entity, parts, visual) in query.iter() {
        if let Some(fill) = visual.style.and_then(|s| s.fill) {
            commands.entity(entity).insert((
                Mesh2d(meshes.add(filled_parts_mesh(&parts.0))),
                MeshMaterial2d(materials.add(ColorMaterial::from_color(fill))),
            ));
        }
        if let Some(path) = &visual.sprite {
            let all: Vec<Vec2> = parts.0.iter().flatten().copied().collect();
            let size = Aabb::from_points(&all).map_or(Vec2::splat(1.0), |b| b.size());
            commands.entity(entity).with_child((
                Sprite {
                    image: asset_server.load(path.clone()),
                    custom_size: Some(size),
                    ..default()
                },
                Transform::from_translation(visual.sprite_offset.extend(0.5)),
            ));
        }
    }
}

fn closed_loop(gizmos: &mut Gizmos, points: &[Vec2], color: Color) {
    let n = points.len();
    for i in 0..n {
        gizmos.line_2d(points[i], points[(i + 1) % n], color);
    }
}

/// Stroke every styled body, plus any debug overlays.
pub fn draw_bodies_system(
    mut gizmos: Gizmos,
    bodies: Query<(&Transform, &ShapeParts, &BodyVisual, &BodyRole)>,
    overlay: Res<OverlayState>,
) {
    for (transform, parts, visual, role) in bodies.iter() {
        let stroke = visual.style.and_then(|s| s.stroke);
        let debug = match role {
            BodyRole::Sensor(_) if overlay.show_sensors => Some(Color::srgba(0.1, 0.6, 1.0, 0.7)),
            _ if overlay.show_parts => Some(Color::srgba(1.0, 0.0, 1.0, 0.5)),
            _ => None,
        };
        let Some(color) = stroke.or(debug) else {
            continue;
        };
        for part in parts.world(transform) {
            closed_loop(&mut gizmos, &part, color);
        }
    }
}

/// Thickness of a sprite stretched along a constraint.
const CONSTRAINT_SPRITE_WIDTH: f32 = 12.0;

/// World-space end points of a constraint.
fn constraint_ends<F: QueryFilter>(
    link: &ConstraintLink,
    transforms: &Query<&Transform, F>,
) -> Option<(Vec2, Vec2)> {
    let anchor = |t: &Transform, local: Vec2| {
        t.translation.truncate() + t.rotation.mul_vec3(local.extend(0.0)).truncate()
    };
    let a = anchor(transforms.get(link.body).ok()?, link.options.anchor_a);
    let b = match link.target {
        ConstraintTarget::Body(other) => anchor(transforms.get(other).ok()?, link.options.anchor_b),
        ConstraintTarget::Point(point) => point + link.options.anchor_b,
    };
    Some((a, b))
}

pub fn draw_constraints_system(
    mut gizmos: Gizmos,
    links: Query<&ConstraintLink>,
    transforms: Query<&Transform, Without<ConstraintSprite>>,
) {
    for link in links.iter() {
        if !link.options.visible || link.options.sprite.is_some() {
            continue;
        }
        if let Some((a, b)) = constraint_ends(link, &transforms) {
            gizmos.line_2d(a, b, link.options.color);
        }
    }
}

pub fn attach_constraint_sprites_system(
    mut commands: Commands,
    links: Query<(Entity, &ConstraintLink), Added<ConstraintLink>>,
    asset_server: Res<AssetServer>,
) {
    for (entity, link) in links.iter() {
        let Some(path) = &link.options.sprite else {
            continue;
        };
        commands.spawn((
            ConstraintSprite { link: entity },
            Sprite::from_image(asset_server.load(path.clone())),
            Transform::default(),
        ));
    }
}

/// Stretch constraint sprites between their anchors; drop them with their link.
pub fn orient_constraint_sprites_system(
    mut commands: Commands,
    mut sprites: Query<(Entity, &ConstraintSprite, &mut Sprite, &mut Transform, &mut Visibility)>,
    links: Query<&ConstraintLink>,
    transforms: Query<&Transform, Without<ConstraintSprite>>,
) {
    for (entity, marker, mut sprite, mut transform, mut visibility) in sprites.iter_mut() {
        let Ok(link) = links.get(marker.link) else {
            commands.entity(entity).despawn();
            continue;
        };
        let Some((a, b)) = constraint_ends(link, &transforms) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        let span = b - a;
        *visibility = if link.options.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        sprite.custom_size = Some(Vec2::new(span.length(), CONSTRAINT_SPRITE_WIDTH));
        transform.translation = ((a + b) * 0.5).extend(0.4);
        transform.rotation = Quat::from_rotation_z(span.y.atan2(span.x));
    }
}

/// Dashed rectangle marking where the tutorial drawing should go.
pub fn draw_hint_system(mut gizmos: Gizmos, manager: Res<LevelManager>, viewport: Res<Viewport>) {
    let Some((center, size)) = manager.hint else {
        return;
    };
    let color = Color::srgb_u8(247, 54, 0);
    let half = size * 0.5;
    let corners = [
        center + Vec2::new(-half.x, -half.y),
        center + Vec2::new(half.x, -half.y),
        center + Vec2::new(half.x, half.y),
        center + Vec2::new(-half.x, half.y),
    ];
    for i in 0..4 {
        let (from, to) = (corners[i], corners[(i + 1) % 4]);
        let length = from.distance(to);
        let dir = (to - from).normalize_or_zero();
        let mut t = 0.0;
        while t < length {
            let end = (t + 5.0).min(length);
            gizmos.line_2d(
                viewport.to_world(from + dir * t),
                viewport.to_world(from + dir * end),
                color,
            );
            t += 10.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelId;

    #[test]
    fn parts_mesh_fans_each_part() {
        let parts = vec![
            crate::geometry::rectangle(10.0, 10.0),
            vec![Vec2::ZERO, Vec2::X, Vec2::Y],
        ];
        let mesh = filled_parts_mesh(&parts);
        assert_eq!(mesh.count_vertices(), 7);
        match mesh.indices() {
            Some(Indices::U32(idx)) => {
                assert_eq!(idx.len(), (2 + 1) * 3);
                assert_eq!(&idx[6..], &[4, 5, 6]);
            }
            _ => panic!("expected u32 indices"),
        }
    }

    #[test]
    fn hud_line_reports_state() {
        let manager = LevelManager {
            current: LevelId::Bridge,
            ..LevelManager::default()
        };
        assert_eq!(hud_line(&manager, GameState::Running), "Level 3: bridge");
        assert!(hud_line(&manager, GameState::Win).contains("solved"));
    }
}

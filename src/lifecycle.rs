//! Level lifecycle: one [`LevelManager`] owns the current level, its bodies
//! and the references the collision rules need.
//!
//! Loading is message driven. A [`LoadLevel`] request despawns every
//! [`LevelBody`] before the new level's spawns are queued, so bodies of two
//! levels never coexist.

use crate::body::{
    constrain_to, spawn_descriptor, BodyConstraints, BodyRole, ConstraintKind, ConstraintOptions,
    ConstraintTarget, HazardSide, LevelBody, Motion, PhysicsOptions, SensorRole,
};
use crate::button::ButtonTop;
use crate::config::GameConfig;
use crate::hazard::HazardSpin;
use crate::level::{describe, LevelDescriptor, LevelId, LevelSequence, Viewport};
use crate::rules::{GameState, LevelRule, WinPolicy};
use bevy::prelude::*;
use bevy::window::WindowResized;

/// Which level to load.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadLevel {
    Id(LevelId),
    /// 1-based position in [`LevelId::ALL`].
    Index(usize),
    Next,
    First,
    /// The current level again (e.g. after a resize).
    Reload,
}

/// Named bodies of the current level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelRefs {
    pub win_sensors: Vec<Entity>,
    pub fail_sensors: Vec<Entity>,
    pub crush_sensors: Vec<Entity>,
    pub hazards: Vec<(HazardSide, Entity)>,
    pub button_tops: Vec<Entity>,
    pub character: Option<Entity>,
    pub props: Vec<Entity>,
}

#[derive(Resource, Debug, Clone)]
pub struct LevelManager {
    pub current: LevelId,
    pub sequence: LevelSequence,
    /// Bumped on every load; drops issued under an older generation are stale.
    pub generation: u64,
    pub rule: LevelRule,
    /// Every body spawned for the current level, in spawn order.
    pub drawables: Vec<Entity>,
    pub refs: LevelRefs,
    /// The single live dropped body.
    pub dropped: Option<Entity>,
    /// Dashed placement hint (screen-space centre and size).
    pub hint: Option<(Vec2, Vec2)>,
}

impl Default for LevelManager {
    fn default() -> Self {
        Self {
            current: LevelId::Tutorial,
            sequence: LevelSequence::default(),
            generation: 0,
            rule: LevelRule::FreePlay,
            drawables: Vec::new(),
            refs: LevelRefs::default(),
            dropped: None,
            hint: None,
        }
    }
}

impl LevelManager {
    /// Resolve a request into the level to load, moving the sequence cursor.
    pub fn resolve(&mut self, request: LoadLevel) -> Option<LevelId> {
        match request {
            LoadLevel::Id(id) => {
                self.sequence.seek(id);
                Some(id)
            }
            LoadLevel::Index(index) => {
                let id = LevelId::from_index(index)?;
                self.sequence.seek(id);
                Some(id)
            }
            LoadLevel::Next => self.sequence.advance(),
            LoadLevel::First => self.sequence.reset(),
            LoadLevel::Reload => Some(self.current),
        }
    }

    /// Forget every body of the previous level.
    fn clear(&mut self) {
        self.drawables.clear();
        self.refs = LevelRefs::default();
        self.dropped = None;
    }
}

/// Spawn every body of `level`; returns the drawables and named references.
pub fn spawn_level(
    commands: &mut Commands,
    viewport: &Viewport,
    config: &GameConfig,
    level: &LevelDescriptor,
) -> (Vec<Entity>, LevelRefs) {
    let mut drawables = Vec::new();
    let mut refs = LevelRefs::default();

    for descriptor in &level.terrain {
        let options = PhysicsOptions::fixed(BodyRole::Terrain);
        drawables.extend(spawn_descriptor(commands, viewport, config, descriptor, &options));
    }

    for (role, descriptor) in &level.sensors {
        let options = PhysicsOptions::sensor(*role);
        let Some(entity) = spawn_descriptor(commands, viewport, config, descriptor, &options) else {
            continue;
        };
        match role {
            SensorRole::Win => refs.win_sensors.push(entity),
            SensorRole::Fail => refs.fail_sensors.push(entity),
            SensorRole::Crush => refs.crush_sensors.push(entity),
        }
        drawables.push(entity);
    }

    for (side, descriptor) in &level.hazards {
        let options = PhysicsOptions::kinematic(BodyRole::Hazard(*side));
        let Some(entity) = spawn_descriptor(commands, viewport, config, descriptor, &options) else {
            continue;
        };
        commands.entity(entity).insert(HazardSpin::new(config.hazard_spin_step));
        refs.hazards.push((*side, entity));
        drawables.push(entity);
    }

    let policy = match level.rule {
        LevelRule::Button { policy, .. } => policy,
        _ => WinPolicy::OnPress,
    };
    for button in &level.buttons {
        let base = PhysicsOptions::fixed(BodyRole::ButtonBase);
        drawables.extend(spawn_descriptor(commands, viewport, config, &button.base, &base));

        let top = PhysicsOptions::kinematic(BodyRole::ButtonTop);
        let Some(entity) = spawn_descriptor(commands, viewport, config, &button.top, &top) else {
            continue;
        };
        let rest = viewport.to_world(button.top.position.unwrap_or(viewport.center()));
        commands.entity(entity).insert(ButtonTop::new(
            rest,
            config.button_travel,
            config.button_return_delay_secs,
            policy,
        ));
        refs.button_tops.push(entity);
        drawables.push(entity);
    }

    if let Some(descriptor) = &level.character {
        let options = PhysicsOptions {
            motion: Motion::Dynamic,
            restitution: Some(crate::constants::CHARACTER_RESTITUTION),
            friction: Some(crate::constants::CHARACTER_FRICTION),
            ..PhysicsOptions::fixed(BodyRole::Character)
        };
        if let Some(entity) = spawn_descriptor(commands, viewport, config, descriptor, &options) {
            refs.character = Some(entity);
            drawables.push(entity);
        }
    }

    for tether in &level.tethers {
        let options = PhysicsOptions::dynamic(BodyRole::Prop);
        let Some(entity) = spawn_descriptor(commands, viewport, config, &tether.body, &options) else {
            continue;
        };
        let position = viewport.to_world(tether.body.position.unwrap_or(viewport.center()));
        let mut constraints = BodyConstraints::default();
        constrain_to(
            commands,
            &mut constraints,
            entity,
            position,
            Some(ConstraintTarget::Point(viewport.to_world(tether.anchor))),
            ConstraintOptions {
                kind: ConstraintKind::Rope {
                    max_length: tether.length,
                },
                color: Color::srgb(0.2, 0.2, 0.2),
                ..default()
            },
        );
        commands.entity(entity).insert(constraints);
        refs.props.push(entity);
        drawables.push(entity);
    }

    (drawables, refs)
}

/// Apply runtime tunables to a level's authored rule.
fn tuned_rule(rule: LevelRule, config: &GameConfig) -> LevelRule {
    match rule {
        LevelRule::HazardJam { .. } => LevelRule::HazardJam {
            depth_threshold: config.hazard_jam_depth,
        },
        other => other,
    }
}

/// Handle the latest [`LoadLevel`] request of this frame.
pub fn level_load_system(
    mut commands: Commands,
    mut requests: MessageReader<LoadLevel>,
    mut manager: ResMut<LevelManager>,
    viewport: Res<Viewport>,
    config: Res<GameConfig>,
    level_bodies: Query<Entity, With<LevelBody>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(request) = requests.read().last().copied() else {
        return;
    };
    let Some(id) = manager.resolve(request) else {
        error!("Ignoring level request {:?}: no such level", request);
        return;
    };

    for entity in level_bodies.iter() {
        commands.entity(entity).despawn();
    }
    manager.clear();

    let level = describe(id, &viewport);
    let (drawables, refs) = spawn_level(&mut commands, &viewport, &config, &level);
    info!(
        "Loaded level {} ({}) with {} bodies",
        id.index(),
        id,
        drawables.len()
    );

    manager.current = id;
    manager.generation += 1;
    manager.rule = tuned_rule(level.rule, &config);
    manager.hint = level.hint;
    manager.drawables = drawables;
    manager.refs = refs;
    next_state.set(GameState::Running);
}

/// Startup: size the viewport from the configured window and load the start level.
pub fn start_level_system(
    config: Res<GameConfig>,
    mut viewport: ResMut<Viewport>,
    mut requests: MessageWriter<LoadLevel>,
) {
    *viewport = Viewport::new(config.window_width, config.window_height);
    requests.write(LoadLevel::Id(config.start_level));
}

/// Track window size changes and rebuild the level at the new size.
pub fn viewport_resize_system(
    mut resized: MessageReader<WindowResized>,
    mut viewport: ResMut<Viewport>,
    mut requests: MessageWriter<LoadLevel>,
) {
    let Some(latest) = resized.read().last() else {
        return;
    };
    let next = Viewport::new(latest.width, latest.height);
    if next.width <= 0.0 || next.height <= 0.0 || next == *viewport {
        return;
    }
    *viewport = next;
    requests.write(LoadLevel::Reload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_moves_the_sequence() {
        let mut manager = LevelManager::default();
        assert_eq!(manager.resolve(LoadLevel::Next), Some(LevelId::ButtonTutorial));
        manager.current = LevelId::ButtonTutorial;
        assert_eq!(manager.resolve(LoadLevel::Reload), Some(LevelId::ButtonTutorial));
        assert_eq!(manager.resolve(LoadLevel::Index(3)), Some(LevelId::Bridge));
        assert_eq!(manager.resolve(LoadLevel::Next), Some(LevelId::Spinner));
        assert_eq!(manager.resolve(LoadLevel::First), Some(LevelId::Tutorial));
        assert_eq!(manager.resolve(LoadLevel::Index(99)), None);
    }

    #[test]
    fn tuned_rule_uses_configured_jam_depth() {
        let config = GameConfig {
            hazard_jam_depth: 4.0,
            ..GameConfig::default()
        };
        assert_eq!(
            tuned_rule(LevelRule::HazardJam { depth_threshold: 10.0 }, &config),
            LevelRule::HazardJam { depth_threshold: 4.0 }
        );
        assert_eq!(tuned_rule(LevelRule::Bridge, &config), LevelRule::Bridge);
    }
}

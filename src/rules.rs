//! Per-level win/lose rules.
//!
//! [`evaluate`] is a pure function from the current [`LevelRule`] and one
//! frame's collision data to a list of [`RuleOutcome`]s. The surrounding
//! system gathers that data from the world and applies the outcomes. Pair
//! order never matters: either side of a pair may hold any role.

use crate::body::{penetration_depth, BodyMass, BodyRole, HazardSide, SensorRole};
use crate::button::ButtonPressed;
use crate::config::GameConfig;
use crate::hazard::HazardSpin;
use crate::lifecycle::LevelManager;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Top-level play state. Rules only run while `Running`.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Running,
    Win,
    Failure,
}

/// When a button level counts as won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinPolicy {
    /// As soon as the button is pressed.
    OnPress,
    /// When the pressed button returns to rest.
    OnRelease,
}

/// The single rule a level is judged by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelRule {
    /// Nothing to win or lose.
    FreePlay,
    /// Span both win sensors without touching a fail sensor.
    Bridge,
    /// Jam the hazards by wedging the dropped shape into them.
    HazardJam { depth_threshold: f32 },
    /// Hit the button top hard enough.
    Button {
        min_mass: f32,
        min_speed: f32,
        policy: WinPolicy,
    },
    /// Press a crush sensor with enough mass.
    Squash { min_mass: f32 },
}

/// One side of a collision-start pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Participant {
    pub entity: Entity,
    pub role: BodyRole,
    pub mass: f32,
    /// Speed in pixels per physics tick.
    pub speed: f32,
}

/// A body the dropped shape currently overlaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub entity: Entity,
    pub role: BodyRole,
    pub depth: f32,
}

/// Everything the rules look at for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionFrame {
    pub pairs: Vec<(Participant, Participant)>,
    pub dropped_overlaps: Vec<Overlap>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleOutcome {
    SetState(GameState),
    StopHazard(HazardSide),
    StopAllHazards,
    ActuateButton(Entity),
}

/// Split a pair into (the side with `role`, the other side).
fn side_with(pair: &(Participant, Participant), role: BodyRole) -> Option<(Participant, Participant)> {
    if pair.0.role == role {
        Some((pair.0, pair.1))
    } else if pair.1.role == role {
        Some((pair.1, pair.0))
    } else {
        None
    }
}

/// Judge one frame. Returns nothing when no collision started this frame.
///
/// Evaluation stops at the first outcome that leaves `Running`.
pub fn evaluate(rule: &LevelRule, frame: &CollisionFrame) -> Vec<RuleOutcome> {
    let mut outcomes = Vec::new();
    if frame.pairs.is_empty() {
        return outcomes;
    }

    match *rule {
        LevelRule::FreePlay => {}
        LevelRule::Bridge => {
            let touching = |role| {
                frame
                    .dropped_overlaps
                    .iter()
                    .filter(|o| o.role == BodyRole::Sensor(role))
                    .count()
            };
            if touching(SensorRole::Fail) > 0 {
                outcomes.push(RuleOutcome::SetState(GameState::Failure));
            } else if touching(SensorRole::Win) >= 2 {
                outcomes.push(RuleOutcome::SetState(GameState::Win));
            }
        }
        LevelRule::HazardJam { depth_threshold } => {
            for overlap in frame.dropped_overlaps.iter().filter(|o| o.depth > depth_threshold) {
                match overlap.role {
                    BodyRole::Hazard(side) => outcomes.push(RuleOutcome::StopHazard(side)),
                    BodyRole::Terrain => outcomes.push(RuleOutcome::StopAllHazards),
                    _ => {}
                }
            }
        }
        LevelRule::Button {
            min_mass,
            min_speed,
            policy,
        } => {
            for pair in &frame.pairs {
                let Some((top, other)) = side_with(pair, BodyRole::ButtonTop) else {
                    continue;
                };
                if other.mass >= min_mass && other.speed >= min_speed {
                    outcomes.push(RuleOutcome::ActuateButton(top.entity));
                    if policy == WinPolicy::OnPress {
                        outcomes.push(RuleOutcome::SetState(GameState::Win));
                        break;
                    }
                }
            }
        }
        LevelRule::Squash { min_mass } => {
            let heavy = frame.pairs.iter().any(|pair| {
                side_with(pair, BodyRole::Sensor(SensorRole::Crush)).is_some_and(|(_, other)| {
                    !matches!(other.role, BodyRole::Terrain | BodyRole::Sensor(_)) && other.mass >= min_mass
                })
            });
            if heavy {
                outcomes.push(RuleOutcome::SetState(GameState::Win));
            }
        }
    }
    outcomes
}

/// Gather this frame's collision starts, evaluate the level rule and apply
/// the outcomes. Runs only in [`GameState::Running`].
pub fn collision_rules_system(
    mut collision_events: MessageReader<CollisionEvent>,
    manager: Res<LevelManager>,
    config: Res<GameConfig>,
    bodies: Query<(Entity, &BodyRole, &BodyMass, Option<&Velocity>, &Transform, &Collider)>,
    mut hazards: Query<(&BodyRole, &mut HazardSpin)>,
    mut presses: MessageWriter<ButtonPressed>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let participant = |entity: Entity| {
        bodies.get(entity).ok().map(|(_, role, mass, velocity, _, _)| Participant {
            entity,
            role: *role,
            mass: mass.0,
            speed: velocity.map_or(0.0, |v| v.linvel.length()) / config.ticks_per_second,
        })
    };

    let mut frame = CollisionFrame::default();
    for event in collision_events.read() {
        if let CollisionEvent::Started(e1, e2, _) = event {
            if let (Some(a), Some(b)) = (participant(*e1), participant(*e2)) {
                frame.pairs.push((a, b));
            }
        }
    }
    if frame.pairs.is_empty() {
        return;
    }

    if let Some(dropped) = manager.dropped {
        if let Ok((_, _, _, _, transform, collider)) = bodies.get(dropped) {
            for (entity, role, _, _, other_transform, other_collider) in bodies.iter() {
                if entity == dropped {
                    continue;
                }
                if let Some(depth) = penetration_depth(collider, transform, other_collider, other_transform) {
                    frame.dropped_overlaps.push(Overlap {
                        entity,
                        role: *role,
                        depth,
                    });
                }
            }
        }
    }

    for outcome in evaluate(&manager.rule, &frame) {
        match outcome {
            RuleOutcome::SetState(state) => {
                info!("Level {} ended: {:?}", manager.current, state);
                next_state.set(state);
            }
            RuleOutcome::StopHazard(side) => {
                for (role, mut spin) in hazards.iter_mut() {
                    if *role == BodyRole::Hazard(side) && spin.is_spinning() {
                        info!("Hazard {:?} jammed", side);
                        spin.stop();
                    }
                }
            }
            RuleOutcome::StopAllHazards => {
                for (_, mut spin) in hazards.iter_mut() {
                    spin.stop();
                }
            }
            RuleOutcome::ActuateButton(entity) => {
                presses.write(ButtonPressed(entity));
            }
        }
    }
}

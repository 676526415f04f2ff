//! Level registry: identifiers, ordering and per-level layouts.
//!
//! Every layout is computed from the [`Viewport`] at load time, so the same
//! level reloaded after a resize keeps its proportions. Geometry here is in
//! screen space (origin top-left, y down); bodies convert it on spawn.

use crate::body::{BodyDescriptor, ContactEffectSpec, HazardSide, SensorRole, ShapeSpec, Style};
use crate::constants::{CHARACTER_FRAME_H, CHARACTER_FRAME_W, CHARACTER_SCALE, HAZARD_KNOCKBACK_IMPULSE};
use crate::error::{GameError, GameResult};
use crate::hazard::SpikeArc;
use crate::rules::{LevelRule, WinPolicy};
use bevy::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Window size in pixels, used to lay out levels and map coordinates.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(crate::constants::WINDOW_WIDTH, crate::constants::WINDOW_HEIGHT)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Screen-space centre.
    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// Screen (top-left origin, y down) → world (centred, y up).
    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        Vec2::new(screen.x - self.width * 0.5, self.height * 0.5 - screen.y)
    }

    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(world.x + self.width * 0.5, self.height * 0.5 - world.y)
    }

    /// Normalized `[0,1]²` position → screen pixels.
    pub fn from_normalized(&self, normalized: Vec2) -> Vec2 {
        normalized * self.size()
    }
}

/// Symbolic level identifiers in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelId {
    Tutorial,
    ButtonTutorial,
    Bridge,
    Spinner,
    HazardCorridor,
    ButtonPuzzle,
    Squash,
}

impl LevelId {
    pub const ALL: [LevelId; 7] = [
        LevelId::Tutorial,
        LevelId::ButtonTutorial,
        LevelId::Bridge,
        LevelId::Spinner,
        LevelId::HazardCorridor,
        LevelId::ButtonPuzzle,
        LevelId::Squash,
    ];

    /// 1-based position in [`LevelId::ALL`].
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&l| l == self).map_or(0, |i| i + 1)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            LevelId::Tutorial => "tutorial",
            LevelId::ButtonTutorial => "button_tutorial",
            LevelId::Bridge => "bridge",
            LevelId::Spinner => "spinner",
            LevelId::HazardCorridor => "hazard_corridor",
            LevelId::ButtonPuzzle => "button_puzzle",
            LevelId::Squash => "squash",
        }
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LevelId {
    type Err = GameError;

    /// Accepts a level name (case-insensitive, `-` or `_`) or a 1-based index.
    fn from_str(s: &str) -> GameResult<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(index) = key.parse::<usize>() {
            return Self::from_index(index).ok_or(GameError::UnknownLevel { name: s.to_string() });
        }
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.name() == key)
            .ok_or(GameError::UnknownLevel { name: s.to_string() })
    }
}

/// Ordered list of levels with a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSequence {
    levels: Vec<LevelId>,
    cursor: usize,
}

impl Default for LevelSequence {
    fn default() -> Self {
        Self::new(LevelId::ALL.to_vec())
    }
}

impl LevelSequence {
    pub fn new(levels: Vec<LevelId>) -> Self {
        Self { levels, cursor: 0 }
    }

    pub fn current(&self) -> Option<LevelId> {
        self.levels.get(self.cursor).copied()
    }

    /// Move to the next level; stays on the last one.
    pub fn advance(&mut self) -> Option<LevelId> {
        if self.cursor + 1 < self.levels.len() {
            self.cursor += 1;
        }
        self.current()
    }

    pub fn reset(&mut self) -> Option<LevelId> {
        self.cursor = 0;
        self.current()
    }

    /// Point the cursor at `id` if it is part of the sequence.
    pub fn seek(&mut self, id: LevelId) -> bool {
        match self.levels.iter().position(|&l| l == id) {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => false,
        }
    }
}

/// Two-part button: a static base and a movable top.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonPlacement {
    pub base: BodyDescriptor,
    pub top: BodyDescriptor,
}

/// A loose body hanging from a fixed point on a rope.
#[derive(Debug, Clone, PartialEq)]
pub struct Tether {
    pub body: BodyDescriptor,
    pub anchor: Vec2,
    pub length: f32,
}

/// Everything a level spawns, in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDescriptor {
    pub id: LevelId,
    pub terrain: Vec<BodyDescriptor>,
    pub sensors: Vec<(SensorRole, BodyDescriptor)>,
    pub hazards: Vec<(HazardSide, BodyDescriptor)>,
    pub buttons: Vec<ButtonPlacement>,
    pub character: Option<BodyDescriptor>,
    pub tethers: Vec<Tether>,
    /// Dashed placement hint as (centre, size).
    pub hint: Option<(Vec2, Vec2)>,
    pub rule: LevelRule,
}

impl LevelDescriptor {
    fn empty(id: LevelId, rule: LevelRule) -> Self {
        Self {
            id,
            terrain: Vec::new(),
            sensors: Vec::new(),
            hazards: Vec::new(),
            buttons: Vec::new(),
            character: None,
            tethers: Vec::new(),
            hint: None,
            rule,
        }
    }
}

fn terrain(x: f32, y: f32, w: f32, h: f32) -> BodyDescriptor {
    BodyDescriptor::rect(x, y, w, h).with_style(Style::outlined())
}

fn sensor(x: f32, y: f32, w: f32, h: f32) -> BodyDescriptor {
    BodyDescriptor::corner_rect(x, y, w, h)
}

fn hazard(x: f32, y: f32, r: f32, spikes: SpikeArc) -> BodyDescriptor {
    BodyDescriptor::new(Some(Vec2::new(x, y)), ShapeSpec::Hazard { r, spikes }).with_style(Style::outlined())
}

fn character_size() -> Vec2 {
    Vec2::new(CHARACTER_FRAME_W, CHARACTER_FRAME_H) * CHARACTER_SCALE
}

/// Character standing on a surface whose top is at `ground_y`.
fn character(x: f32, ground_y: f32) -> BodyDescriptor {
    let size = character_size();
    BodyDescriptor::rect(x, ground_y - size.y * 0.5, size.x, size.y).with_sprite("sprites/character.png")
}

/// Button centred on `x`, resting on a surface whose top is at `ground_y`.
fn button(vp: &Viewport, x: f32, ground_y: f32) -> ButtonPlacement {
    let (w, h) = (vp.width, vp.height);
    let base_h = h / 12.0;
    let top_h = h / 14.0;
    ButtonPlacement {
        base: BodyDescriptor::rect(x, ground_y - base_h * 0.5, w / 6.0, base_h)
            .with_style(Style::filled(Color::BLACK)),
        top: BodyDescriptor::rect(x, ground_y - base_h - top_h * 0.5, w / 10.0, top_h).with_style(Style {
            fill: Some(Color::srgb(0.9, 0.1, 0.1)),
            stroke: Some(Color::BLACK),
            weight: 2.0,
        }),
    }
}

/// Lay out a level for the given viewport.
pub fn describe(id: LevelId, vp: &Viewport) -> LevelDescriptor {
    let (w, h) = (vp.width, vp.height);
    let floor_h = h / 5.0;
    let floor = || terrain(w / 2.0, h - floor_h / 2.0, w, floor_h);

    match id {
        LevelId::Tutorial => {
            let mut level = LevelDescriptor::empty(id, LevelRule::FreePlay);
            level.terrain.push(floor());
            level.hint = Some((Vec2::new(w / 2.0, h / 4.0), Vec2::splat(200.0)));
            level
        }
        LevelId::ButtonTutorial => {
            let mut level = LevelDescriptor::empty(
                id,
                LevelRule::Button {
                    min_mass: 10.0,
                    min_speed: 10.0,
                    policy: WinPolicy::OnPress,
                },
            );
            level.terrain.push(floor());
            level.buttons.push(button(vp, w / 2.0, h - floor_h));
            level
        }
        LevelId::Bridge => {
            let cliff_h = h / 3.0;
            let (left_w, right_w) = (w / 2.0, w / 2.5);
            let cliff_top = h - cliff_h;
            let (win_w, win_h) = (100.0, 50.0);
            let mut level = LevelDescriptor::empty(id, LevelRule::Bridge);
            level.terrain.push(terrain(left_w / 2.0, h - cliff_h / 2.0, left_w, cliff_h));
            level.terrain.push(terrain(w - right_w / 2.0, h - cliff_h / 2.0, right_w, cliff_h));
            level.sensors.push((SensorRole::Fail, sensor(left_w, h - 20.0, w - left_w - right_w, 100.0)));
            level.sensors.push((SensorRole::Win, sensor(left_w - win_w, cliff_top - win_h, win_w, win_h)));
            level.sensors.push((SensorRole::Win, sensor(w - right_w, cliff_top - win_h, win_w, win_h)));
            level.character = Some(character(left_w / 2.0, cliff_top));
            level
        }
        LevelId::Spinner => {
            let pillar_h = h / 3.0;
            let (left_w, right_w) = (w / 2.0, w / 3.5);
            let gap = w - left_w - right_w;
            let mut level = LevelDescriptor::empty(
                id,
                LevelRule::HazardJam {
                    depth_threshold: crate::constants::HAZARD_JAM_DEPTH,
                },
            );
            level.terrain.push(terrain(left_w / 2.0, pillar_h / 2.0, left_w, pillar_h));
            level.terrain.push(terrain(w - right_w / 2.0, pillar_h / 2.0, right_w, pillar_h));
            level.terrain.push(floor());
            level.hazards.push((
                HazardSide::Centre,
                hazard(left_w + gap / 2.0, pillar_h, gap / 2.0 * 0.7, SpikeArc { first: 7, count: 4 }),
            ));
            level.character = Some(character(left_w / 2.0, h - floor_h));
            level
        }
        LevelId::HazardCorridor => {
            let r = h / 10.0;
            let mut level = LevelDescriptor::empty(
                id,
                LevelRule::HazardJam {
                    depth_threshold: crate::constants::HAZARD_JAM_DEPTH,
                },
            );
            let knockback = ContactEffectSpec {
                force: Some(Vec2::new(0.0, HAZARD_KNOCKBACK_IMPULSE)),
                trigger: None,
            };
            level.terrain.push(floor());
            for (side, x) in [(HazardSide::Left, w / 3.0), (HazardSide::Right, w * 2.0 / 3.0)] {
                level
                    .hazards
                    .push((side, hazard(x, h / 2.0, r, SpikeArc::all()).with_effect(knockback)));
            }
            level
        }
        LevelId::ButtonPuzzle => {
            let wall_w = w / 8.0;
            let ledge_w = w / 4.0;
            let pit_h = h / 12.0;
            let pit_w = w - wall_w - ledge_w;
            let pit_x = ledge_w + pit_w / 2.0;
            let mut level = LevelDescriptor::empty(
                id,
                LevelRule::Button {
                    min_mass: 13.0,
                    min_speed: 9.0,
                    policy: WinPolicy::OnRelease,
                },
            );
            level.terrain.push(terrain(w - wall_w / 2.0, h / 2.0, wall_w, h));
            level.terrain.push(terrain(ledge_w / 2.0, h - floor_h / 2.0, ledge_w, floor_h));
            level.terrain.push(terrain(pit_x, h - pit_h / 2.0, pit_w, pit_h));
            level.buttons.push(button(vp, pit_x, h - pit_h));
            let swing_x = ledge_w + pit_w / 4.0;
            level.tethers.push(Tether {
                body: BodyDescriptor::new(Some(Vec2::new(swing_x, h / 3.0)), ShapeSpec::Circle { r: h / 24.0 })
                    .with_style(Style::filled(Color::srgb(0.3, 0.3, 0.35))),
                anchor: Vec2::new(swing_x, 0.0),
                length: h / 3.0,
            });
            level
        }
        LevelId::Squash => {
            let (pad_w, pad_h) = (w / 5.0, h / 8.0);
            let mut level = LevelDescriptor::empty(id, LevelRule::Squash { min_mass: 20.0 });
            level.terrain.push(floor());
            level.sensors.push((
                SensorRole::Crush,
                sensor(w / 2.0 - pad_w / 2.0, h - floor_h - pad_h, pad_w, pad_h),
            ));
            level
        }
    }
}

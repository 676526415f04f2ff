//! Two-part buttons: the top drops when hit hard enough and springs back
//! after a delay.
//!
//! The pending return lives on the [`ButtonTop`] component, so despawning the
//! button (a level change) cancels it with no further bookkeeping.

use crate::rules::{GameState, WinPolicy};
use bevy::prelude::*;

/// A request to press the button top `0`. Ignored if that entity is gone.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPressed(pub Entity);

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ButtonTop {
    /// World-space resting position.
    pub rest: Vec2,
    /// Downward travel when pressed.
    pub travel: f32,
    /// Seconds before a pressed top returns.
    pub delay: f32,
    pub policy: WinPolicy,
    return_in: Option<f32>,
}

impl ButtonTop {
    pub fn new(rest: Vec2, travel: f32, delay: f32, policy: WinPolicy) -> Self {
        Self {
            rest,
            travel,
            delay,
            policy,
            return_in: None,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.return_in.is_some()
    }

    /// Start a press. Returns `false` if the top is already down.
    pub fn press(&mut self) -> bool {
        if self.is_pressed() {
            return false;
        }
        self.return_in = Some(self.delay);
        true
    }

    /// Advance the pending return. Returns `true` on the tick the top comes back up.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.return_in.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.return_in = None;
            return true;
        }
        false
    }

    pub fn pressed_position(&self) -> Vec2 {
        self.rest - Vec2::Y * self.travel
    }
}

/// Move pressed button tops down and schedule their return.
pub fn button_press_system(
    mut presses: MessageReader<ButtonPressed>,
    mut tops: Query<(&mut ButtonTop, &mut Transform)>,
) {
    for ButtonPressed(entity) in presses.read() {
        let Ok((mut top, mut transform)) = tops.get_mut(*entity) else {
            continue;
        };
        if top.press() {
            let down = top.pressed_position();
            transform.translation.x = down.x;
            transform.translation.y = down.y;
            info!("Button pressed");
        }
    }
}

/// Bring pressed tops back up once their delay runs out.
pub fn button_return_system(
    time: Res<Time>,
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut tops: Query<(&mut ButtonTop, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (mut top, mut transform) in tops.iter_mut() {
        if !top.tick(dt) {
            continue;
        }
        transform.translation.x = top.rest.x;
        transform.translation.y = top.rest.y;
        if top.policy == WinPolicy::OnRelease && *state.get() == GameState::Running {
            info!("Button released: level won");
            next_state.set(GameState::Win);
        }
    }
}

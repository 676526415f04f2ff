//! Keyboard and mouse controls.
//!
//! | Input                 | Action                                      |
//! |-----------------------|---------------------------------------------|
//! | `1`–`7`               | Load that level                             |
//! | `N`                   | Next level (stays on the last one)          |
//! | `R`                   | Back to the first level                     |
//! | `Space`               | Reload the current level                    |
//! | Left click            | Drop the latest traced outline at the cursor |
//! | Right click           | Drop a test block (Shift: static)           |
//! | `F1` / `F2`           | Toggle sensor / part outlines               |

use crate::config::GameConfig;
use crate::drop::{ColorTag, DropRequest, DropShape};
use crate::lifecycle::{LevelManager, LoadLevel};
use crate::rendering::OverlayState;
use crate::supplier::LatestOutline;
use bevy::input::mouse::MouseButton;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                level_keys_system,
                overlay_toggle_system,
                mouse_drop_system,
                crate::lifecycle::viewport_resize_system,
            ),
        );
    }
}

const LEVEL_KEYS: [KeyCode; 7] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
];

/// Map this frame's key presses to a level request; the last one wins.
pub fn level_request_for(keys: &ButtonInput<KeyCode>) -> Option<LoadLevel> {
    let mut request = None;
    for (i, key) in LEVEL_KEYS.iter().enumerate() {
        if keys.just_pressed(*key) {
            request = Some(LoadLevel::Index(i + 1));
        }
    }
    if keys.just_pressed(KeyCode::KeyN) {
        request = Some(LoadLevel::Next);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        request = Some(LoadLevel::First);
    }
    if keys.just_pressed(KeyCode::Space) {
        request = Some(LoadLevel::Reload);
    }
    request
}

pub fn level_keys_system(keys: Res<ButtonInput<KeyCode>>, mut requests: MessageWriter<LoadLevel>) {
    if let Some(request) = level_request_for(&keys) {
        requests.write(request);
    }
}

pub fn overlay_toggle_system(keys: Res<ButtonInput<KeyCode>>, mut overlay: ResMut<OverlayState>) {
    if keys.just_pressed(KeyCode::F1) {
        overlay.show_sensors = !overlay.show_sensors;
    }
    if keys.just_pressed(KeyCode::F2) {
        overlay.show_parts = !overlay.show_parts;
    }
}

/// Mouse drops. Positions stay in screen space; the drop pipeline converts them.
pub fn mouse_drop_system(
    buttons: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    latest: Res<LatestOutline>,
    manager: Res<LevelManager>,
    config: Res<GameConfig>,
    mut drops: MessageWriter<DropRequest>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Left) {
        let Some(outline) = latest.0.clone() else {
            info!("No traced outline available yet");
            return;
        };
        drops.write(DropRequest {
            shape: DropShape::Outline(outline),
            position: cursor,
            color: ColorTag::Yellow,
            generation: manager.generation,
        });
    } else if buttons.just_pressed(MouseButton::Right) {
        let shift = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
        drops.write(DropRequest {
            shape: DropShape::TestBlock {
                w: config.test_block_size,
                h: config.test_block_size,
            },
            position: cursor,
            color: if shift { ColorTag::Blue } else { ColorTag::Yellow },
            generation: manager.generation,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_keys_pick_levels() {
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::Digit4);
        assert_eq!(level_request_for(&keys), Some(LoadLevel::Index(4)));
    }

    #[test]
    fn navigation_keys() {
        let mut keys = ButtonInput::<KeyCode>::default();
        assert_eq!(level_request_for(&keys), None);
        keys.press(KeyCode::KeyN);
        assert_eq!(level_request_for(&keys), Some(LoadLevel::Next));

        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::Space);
        assert_eq!(level_request_for(&keys), Some(LoadLevel::Reload));

        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::KeyR);
        assert_eq!(level_request_for(&keys), Some(LoadLevel::First));
    }
}

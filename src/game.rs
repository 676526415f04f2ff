//! Headless game core: levels, drops, collision rules, buttons and hazards.
//!
//! Needs no window or renderer, so integration tests can run it on
//! `MinimalPlugins`. Physics stepping comes from Rapier when the binary adds it;
//! the rules only consume its [`CollisionEvent`]s.
//!
//! | System                          | Schedule | Purpose                                   |
//! |---------------------------------|----------|-------------------------------------------|
//! | `start_level_system`            | Startup  | Size the viewport, request the start level |
//! | `level_load_system`             | Update   | Tear down and build levels                |
//! | `drop_system`                   | Update   | Resolve drop requests                     |
//! | `record_collisions_system`      | Update   | Log contacts per body                     |
//! | `collision_rules_system`        | Update   | Win/failure, hazard jams, button hits     |
//! | `button_press_system`           | Update   | Push button tops down                     |
//! | `button_return_system`          | Update   | Return tops after the delay               |
//! | `apply_contact_effects_system`  | Update   | Contact impulses and triggers             |
//! | `hazard_spin_system`            | Update   | Rotate spinning hazards                   |

use crate::body::{apply_contact_effects_system, record_collisions_system};
use crate::button::{button_press_system, button_return_system, ButtonPressed};
use crate::config::GameConfig;
use crate::drop::{drop_system, DropRequest};
use crate::hazard::hazard_spin_system;
use crate::level::Viewport;
use crate::lifecycle::{level_load_system, start_level_system, LevelManager, LoadLevel};
use crate::rules::{collision_rules_system, GameState};
use bevy::prelude::*;
use bevy_rapier2d::prelude::CollisionEvent;

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameConfig>()
            .init_resource::<Viewport>()
            .init_resource::<LevelManager>()
            .init_state::<GameState>()
            .add_message::<CollisionEvent>()
            .add_message::<LoadLevel>()
            .add_message::<DropRequest>()
            .add_message::<ButtonPressed>()
            .add_systems(Startup, start_level_system)
            .add_systems(
                Update,
                (
                    level_load_system,
                    drop_system,
                    record_collisions_system,
                    collision_rules_system.run_if(in_state(GameState::Running)),
                    button_press_system,
                    button_return_system,
                    apply_contact_effects_system,
                    hazard_spin_system,
                )
                    .chain(),
            );
    }
}

use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;
use doodle_drop::config::{self, GameConfig};
use doodle_drop::constants::{WINDOW_HEIGHT, WINDOW_WIDTH};
use doodle_drop::game::GamePlugin;
use doodle_drop::input::ControlsPlugin;
use doodle_drop::lifecycle::start_level_system;
use doodle_drop::rendering::DrawingPlugin;
use doodle_drop::supplier::SupplierPlugin;

/// Configure Rapier physics: downward gravity from the loaded config.
fn setup_physics_config(
    game_config: Res<GameConfig>,
    mut config: Query<&mut RapierConfiguration>,
) {
    for mut cfg in config.iter_mut() {
        cfg.gravity = Vec2::new(0.0, -game_config.gravity);
    }
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Doodle Drop".into(),
            resolution: WindowResolution::new(WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32),
            ..Default::default()
        }),
        ..Default::default()
    }))
    .insert_resource(ClearColor(Color::srgb(0.93, 0.93, 0.93)))
    // Compiled defaults; load_game_config overwrites them from assets/game.toml.
    .insert_resource(GameConfig::default())
    // One world unit per pixel, so layout sizes are also collider sizes.
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0))
    .add_plugins((GamePlugin, DrawingPlugin, ControlsPlugin, SupplierPlugin))
    .add_systems(
        Startup,
        (
            // Load config first so the level layout sees the final window size.
            config::load_game_config.before(start_level_system),
            setup_physics_config.after(config::load_game_config),
        ),
    );

    app.run();
}

//! Headless tests for level loading, drops and the collision rules.
//!
//! These tests run [`GamePlugin`] on [`MinimalPlugins`]: no window, no
//! rendering and no Rapier stepping. Contacts are injected by writing
//! [`CollisionEvent`]s directly, the same messages Rapier would emit.
//!
//! Covered scenarios:
//! 1. Startup loads the configured start level.
//! 2. Loading another level replaces every body of the previous one.
//! 3. Drops overlapping terrain are rejected; a new drop replaces the old one.
//! 4. Drops issued under a previous level are discarded.
//! 5. A heavy, fast hit presses the button and wins; light or slow hits do not.
//! 6. Bridge: spanning both win sensors wins, touching the fail sensor fails.
//! 7. Reloading returns the state to `Running`.
//! 8. A drawing that swallows a terrain block whole is still rejected.
//! 9. A window resize rebuilds the level at the new size.
//! 10. Wedging the drop into one corridor hazard jams only that hazard.
//! 11. Corridor hazards knock the dropped body upwards.
//! 12. The button puzzle's weight hangs from a rope that goes away with the level.
//! 13. An out-of-range level number changes nothing.

use bevy::ecs::world::CommandQueue;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::window::WindowResized;
use bevy_rapier2d::prelude::{CollisionEvent, ExternalImpulse, Velocity};
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;
use doodle_drop::body::{
    spawn_descriptor, BodyConstraints, BodyDescriptor, BodyRole, ConstraintLink, HazardSide, LevelBody,
    PhysicsOptions, ShapeParts,
};
use doodle_drop::config::GameConfig;
use doodle_drop::constants::HAZARD_KNOCKBACK_IMPULSE;
use doodle_drop::drop::{ColorTag, DropRequest, DropShape};
use doodle_drop::game::GamePlugin;
use doodle_drop::hazard::HazardSpin;
use doodle_drop::level::{LevelId, Viewport};
use doodle_drop::lifecycle::{viewport_resize_system, LevelManager, LoadLevel};
use doodle_drop::rules::GameState;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Headless app at the default 1280×720 viewport, with the tutorial loaded.
fn game_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin));
    app.add_plugins(GamePlugin);
    app.update();
    app
}

fn load(app: &mut App, id: LevelId) {
    app.world_mut().write_message(LoadLevel::Id(id));
    app.update();
}

fn manager(app: &App) -> &LevelManager {
    app.world().resource::<LevelManager>()
}

fn state(app: &App) -> GameState {
    *app.world().resource::<State<GameState>>().get()
}

fn count_role(app: &mut App, wanted: fn(&BodyRole) -> bool) -> usize {
    let mut query = app.world_mut().query_filtered::<&BodyRole, With<LevelBody>>();
    query.iter(app.world()).filter(|r| wanted(r)).count()
}

fn dropped_bodies(app: &mut App) -> Vec<Entity> {
    let mut query = app.world_mut().query::<(Entity, &BodyRole)>();
    query
        .iter(app.world())
        .filter(|(_, r)| **r == BodyRole::Dropped)
        .map(|(e, _)| e)
        .collect()
}

/// Drop a `w`×`h` block centred on a screen position, under the current generation.
fn drop_block(app: &mut App, center: Vec2, w: f32, h: f32) {
    let generation = manager(app).generation;
    app.world_mut().write_message(DropRequest {
        shape: DropShape::TestBlock { w, h },
        position: center,
        color: ColorTag::Yellow,
        generation,
    });
    app.update();
}

/// Drop a screen-space outline at `position`, under the current generation.
fn drop_outline(app: &mut App, outline: Vec<Vec2>, position: Vec2) {
    let generation = manager(app).generation;
    app.world_mut().write_message(DropRequest {
        shape: DropShape::Outline(outline),
        position,
        color: ColorTag::Yellow,
        generation,
    });
    app.update();
}

/// Spawn a body outside any level layout.
fn spawn_extra(app: &mut App, descriptor: BodyDescriptor, options: PhysicsOptions) -> Entity {
    let viewport = *app.world().resource::<Viewport>();
    let config = app.world().resource::<GameConfig>().clone();
    let mut queue = CommandQueue::default();
    let entity = {
        let mut commands = Commands::new(&mut queue, app.world());
        spawn_descriptor(&mut commands, &viewport, &config, &descriptor, &options).expect("valid descriptor")
    };
    queue.apply(app.world_mut());
    entity
}

fn terrain_width(app: &mut App) -> f32 {
    let mut query = app.world_mut().query::<(&BodyRole, &ShapeParts)>();
    let (_, parts) = query
        .iter(app.world())
        .find(|(role, _)| **role == BodyRole::Terrain)
        .expect("level has terrain");
    let xs: Vec<f32> = parts.0.iter().flatten().map(|p| p.x).collect();
    xs.iter().copied().fold(f32::MIN, f32::max) - xs.iter().copied().fold(f32::MAX, f32::min)
}

fn hazard(app: &App, side: HazardSide) -> Entity {
    manager(app)
        .refs
        .hazards
        .iter()
        .find(|(s, _)| *s == side)
        .map(|(_, e)| *e)
        .expect("hazard on that side")
}

fn touch(app: &mut App, a: Entity, b: Entity) {
    app.world_mut()
        .write_message(CollisionEvent::Started(a, b, CollisionEventFlags::empty()));
    app.update();
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn startup_loads_the_tutorial() {
    let mut app = game_app();
    assert_eq!(manager(&app).current, LevelId::Tutorial);
    assert_eq!(manager(&app).generation, 1);
    assert!(manager(&app).hint.is_some(), "tutorial shows a placement hint");
    assert_eq!(count_role(&mut app, |r| *r == BodyRole::Terrain), 1);
    assert_eq!(state(&app), GameState::Running);
}

#[test]
fn loading_a_level_replaces_the_previous_one() {
    let mut app = game_app();
    load(&mut app, LevelId::Bridge);

    let m = manager(&app);
    assert_eq!(m.current, LevelId::Bridge);
    assert_eq!(m.generation, 2);
    assert_eq!(m.refs.win_sensors.len(), 2);
    assert_eq!(m.refs.fail_sensors.len(), 1);
    assert!(m.refs.character.is_some());
    assert!(m.hint.is_none());
    let drawables = m.drawables.len();

    assert_eq!(count_role(&mut app, |r| *r == BodyRole::Terrain), 2);
    assert_eq!(count_role(&mut app, |r| matches!(r, BodyRole::Sensor(_))), 3);
    assert_eq!(count_role(&mut app, |_| true), drawables);

    app.world_mut().write_message(LoadLevel::Next);
    app.update();
    assert_eq!(manager(&app).current, LevelId::Spinner);
    assert_eq!(count_role(&mut app, |r| matches!(r, BodyRole::Sensor(_))), 0);
    assert_eq!(count_role(&mut app, |r| matches!(r, BodyRole::Hazard(_))), 1);
}

#[test]
fn drop_into_terrain_is_rejected_and_new_drops_replace_old() {
    let mut app = game_app();

    // The tutorial floor's top edge is at screen y = 576.
    drop_block(&mut app, Vec2::new(640.0, 600.0), 100.0, 100.0);
    assert!(dropped_bodies(&mut app).is_empty());
    assert!(manager(&app).dropped.is_none());

    drop_block(&mut app, Vec2::new(640.0, 200.0), 100.0, 100.0);
    let first = dropped_bodies(&mut app);
    assert_eq!(first.len(), 1);
    assert_eq!(manager(&app).dropped, Some(first[0]));

    drop_block(&mut app, Vec2::new(300.0, 200.0), 100.0, 100.0);
    let second = dropped_bodies(&mut app);
    assert_eq!(second.len(), 1);
    assert_ne!(second[0], first[0]);
    assert!(app.world().get_entity(first[0]).is_err());
}

#[test]
fn stale_drop_is_discarded() {
    let mut app = game_app();
    let old_generation = manager(&app).generation;
    load(&mut app, LevelId::Squash);

    app.world_mut().write_message(DropRequest {
        shape: DropShape::TestBlock { w: 100.0, h: 100.0 },
        position: Vec2::new(640.0, 200.0),
        color: ColorTag::Yellow,
        generation: old_generation,
    });
    app.update();
    assert!(dropped_bodies(&mut app).is_empty());
}

#[test]
fn heavy_fast_hit_presses_button_and_wins() {
    let mut app = game_app();
    load(&mut app, LevelId::ButtonTutorial);
    let top = manager(&app).refs.button_tops[0];
    let rest_y = app.world().get::<Transform>(top).unwrap().translation.y;
    let top_y = |app: &App| app.world().get::<Transform>(top).unwrap().translation.y;

    // 50×100 block: mass 5, below the threshold of 10.
    drop_block(&mut app, Vec2::new(200.0, 200.0), 50.0, 100.0);
    let light = dropped_bodies(&mut app)[0];
    // 900 px/s is 15 px per tick.
    app.world_mut().get_mut::<Velocity>(light).unwrap().linvel = Vec2::new(0.0, -900.0);
    touch(&mut app, light, top);
    app.update();
    assert_eq!(top_y(&app), rest_y);
    assert_eq!(state(&app), GameState::Running);

    // 200×100 block: mass 20, but too slow at 1 px per tick.
    drop_block(&mut app, Vec2::new(1000.0, 200.0), 200.0, 100.0);
    let heavy = dropped_bodies(&mut app)[0];
    app.world_mut().get_mut::<Velocity>(heavy).unwrap().linvel = Vec2::new(0.0, -60.0);
    touch(&mut app, heavy, top);
    assert_eq!(top_y(&app), rest_y);

    app.world_mut().get_mut::<Velocity>(heavy).unwrap().linvel = Vec2::new(0.0, -900.0);
    touch(&mut app, top, heavy);
    assert!((rest_y - top_y(&app) - 10.0).abs() < 1e-3, "top moves down by its travel");

    app.update();
    assert_eq!(state(&app), GameState::Win);
}

#[test]
fn bridge_spanning_both_win_sensors_wins() {
    let mut app = game_app();
    load(&mut app, LevelId::Bridge);

    // Cliff tops sit at y = 480; the win sensors cover y 430..480 at each edge.
    drop_block(&mut app, Vec2::new(704.0, 455.0), 400.0, 40.0);
    let bridge = dropped_bodies(&mut app);
    assert_eq!(bridge.len(), 1, "sensors do not block a drop");

    let win = manager(&app).refs.win_sensors[0];
    touch(&mut app, bridge[0], win);
    app.update();
    assert_eq!(state(&app), GameState::Win);
}

#[test]
fn bridge_fail_sensor_fails_and_reload_resets() {
    let mut app = game_app();
    load(&mut app, LevelId::Bridge);

    // The fail sensor spans the gap from y = 700 down.
    drop_block(&mut app, Vec2::new(704.0, 710.0), 100.0, 20.0);
    let block = dropped_bodies(&mut app)[0];
    let fail = manager(&app).refs.fail_sensors[0];
    touch(&mut app, fail, block);
    app.update();
    assert_eq!(state(&app), GameState::Failure);

    app.world_mut().write_message(LoadLevel::Reload);
    app.update();
    app.update();
    assert_eq!(state(&app), GameState::Running);
    assert_eq!(manager(&app).current, LevelId::Bridge);
    assert!(manager(&app).dropped.is_none());
    assert!(dropped_bodies(&mut app).is_empty());
}

#[test]
fn drawing_around_a_terrain_block_is_rejected() {
    let mut app = game_app();
    spawn_extra(
        &mut app,
        BodyDescriptor::corner_rect(100.0, 100.0, 50.0, 50.0),
        PhysicsOptions::fixed(BodyRole::Terrain),
    );
    let before = count_role(&mut app, |_| true);
    assert_eq!(before, 2);

    // 300 px square, 210 px once scaled: covers screen 20..230 on both axes.
    let square = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(300.0, 0.0),
        Vec2::new(300.0, 300.0),
        Vec2::new(0.0, 300.0),
    ];
    drop_outline(&mut app, square.clone(), Vec2::new(125.0, 125.0));
    assert_eq!(count_role(&mut app, |_| true), before);
    assert!(dropped_bodies(&mut app).is_empty());

    drop_outline(&mut app, square, Vec2::new(640.0, 250.0));
    assert_eq!(dropped_bodies(&mut app).len(), 1, "the same drawing fits in open space");
}

#[test]
fn resize_rebuilds_the_level_at_the_new_size() {
    let mut app = game_app();
    app.add_message::<WindowResized>();
    app.add_systems(Update, viewport_resize_system);
    let before = terrain_width(&mut app);

    app.world_mut().write_message(WindowResized {
        window: Entity::PLACEHOLDER,
        width: 1920.0,
        height: 1080.0,
    });
    app.update();
    app.update();

    assert_eq!(*app.world().resource::<Viewport>(), Viewport::new(1920.0, 1080.0));
    assert_eq!(manager(&app).generation, 2);
    assert_eq!(manager(&app).current, LevelId::Tutorial);
    assert_eq!(count_role(&mut app, |r| *r == BodyRole::Terrain), 1);
    assert!((terrain_width(&mut app) / before - 1.5).abs() < 1e-3);
}

#[test]
fn wedged_drop_jams_only_the_touched_hazard() {
    let mut app = game_app();
    load(&mut app, LevelId::HazardCorridor);
    let (left, right) = (hazard(&app, HazardSide::Left), hazard(&app, HazardSide::Right));

    drop_block(&mut app, Vec2::new(640.0, 100.0), 60.0, 60.0);
    let block = dropped_bodies(&mut app)[0];
    let at_left = app.world().get::<Transform>(left).unwrap().translation;
    app.world_mut().get_mut::<Transform>(block).unwrap().translation = at_left;

    touch(&mut app, block, left);
    let spinning = |app: &App, e: Entity| app.world().get::<HazardSpin>(e).unwrap().is_spinning();
    assert!(!spinning(&app, left));
    assert!(spinning(&app, right));
    assert_eq!(state(&app), GameState::Running);
}

#[test]
fn corridor_hazards_knock_the_drop_upwards() {
    let mut app = game_app();
    load(&mut app, LevelId::HazardCorridor);
    let right = hazard(&app, HazardSide::Right);

    drop_block(&mut app, Vec2::new(640.0, 100.0), 60.0, 60.0);
    let block = dropped_bodies(&mut app)[0];
    touch(&mut app, right, block);

    let impulse = app.world().get::<ExternalImpulse>(block).unwrap();
    assert_eq!(impulse.impulse, Vec2::new(0.0, HAZARD_KNOCKBACK_IMPULSE));
    assert_eq!(app.world().get::<ExternalImpulse>(right).unwrap().impulse, Vec2::ZERO);
    assert!(app.world().get::<HazardSpin>(right).unwrap().is_spinning(), "a graze does not jam");
}

#[test]
fn puzzle_weight_hangs_from_a_rope() {
    let mut app = game_app();
    load(&mut app, LevelId::ButtonPuzzle);
    let props = manager(&app).refs.props.clone();
    assert_eq!(props.len(), 1);
    assert_eq!(count_role(&mut app, |r| *r == BodyRole::Prop), 1);

    let handles = app.world().get::<BodyConstraints>(props[0]).unwrap().0.clone();
    assert_eq!(handles.len(), 1);
    let link = app.world().get::<ConstraintLink>(handles[0].link).expect("rope link");
    assert_eq!(link.body, props[0]);
    let anchor = link.anchor_body.expect("rope hangs from a fixed point");
    assert_eq!(handles[0].anchor, Some(anchor));
    assert!(app.world().get_entity(anchor).is_ok());

    load(&mut app, LevelId::Tutorial);
    assert!(app.world().get_entity(handles[0].link).is_err());
    assert!(app.world().get_entity(anchor).is_err());
}

#[test]
fn unknown_level_number_changes_nothing() {
    let mut app = game_app();
    app.world_mut().write_message(LoadLevel::Index(99));
    app.update();
    assert_eq!(manager(&app).current, LevelId::Tutorial);
    assert_eq!(manager(&app).generation, 1);
    assert_eq!(count_role(&mut app, |r| *r == BodyRole::Terrain), 1);
}

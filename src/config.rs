//! Runtime game configuration loaded from `assets/game.toml`.
//!
//! [`GameConfig`] is a Bevy [`Resource`] that mirrors the tunables in
//! [`crate::constants`]. At startup, [`load_game_config`] reads
//! `assets/game.toml` and overwrites the defaults with any values present in
//! the file. Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the values you care about.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `GameConfig::default()`.

use crate::constants::*;
use crate::level::LevelId;
use bevy::prelude::*;
use serde::Deserialize;

/// Runtime-tunable physics and gameplay configuration.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // ── Window ────────────────────────────────────────────────────────────────
    pub window_width: f32,
    pub window_height: f32,
    pub start_level: LevelId,

    // ── Physics ───────────────────────────────────────────────────────────────
    pub gravity: f32,
    pub body_density: f32,
    pub ticks_per_second: f32,
    pub default_friction: f32,

    // ── Restitution model ─────────────────────────────────────────────────────
    pub restitution_scale: f32,
    pub min_restitution_mass: f32,
    pub max_restitution_mass: f32,

    // ── Outlines ──────────────────────────────────────────────────────────────
    pub outline_sample_density: f32,
    pub drop_outline_scale: f32,
    pub outline_simplify_tolerance: f32,
    pub test_block_size: f32,

    // ── Hazard ────────────────────────────────────────────────────────────────
    pub hazard_spin_step: f32,
    pub hazard_jam_depth: f32,

    // ── Button ────────────────────────────────────────────────────────────────
    pub button_travel: f32,
    pub button_return_delay_secs: f32,

    // ── Outline supplier ──────────────────────────────────────────────────────
    pub supplier_enabled: bool,
    pub supplier_poll_interval_secs: f32,
    pub supplier_position_file: String,
    pub supplier_svg_file: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: WINDOW_WIDTH,
            window_height: WINDOW_HEIGHT,
            start_level: LevelId::Tutorial,
            gravity: GRAVITY,
            body_density: BODY_DENSITY,
            ticks_per_second: TICKS_PER_SECOND,
            default_friction: DEFAULT_FRICTION,
            restitution_scale: RESTITUTION_SCALE,
            min_restitution_mass: MIN_RESTITUTION_MASS,
            max_restitution_mass: MAX_RESTITUTION_MASS,
            outline_sample_density: OUTLINE_SAMPLE_DENSITY,
            drop_outline_scale: DROP_OUTLINE_SCALE,
            outline_simplify_tolerance: OUTLINE_SIMPLIFY_TOLERANCE,
            test_block_size: TEST_BLOCK_SIZE,
            hazard_spin_step: HAZARD_SPIN_STEP,
            hazard_jam_depth: HAZARD_JAM_DEPTH,
            button_travel: BUTTON_TRAVEL,
            button_return_delay_secs: BUTTON_RETURN_DELAY_SECS,
            supplier_enabled: true,
            supplier_poll_interval_secs: SUPPLIER_POLL_INTERVAL_SECS,
            supplier_position_file: SUPPLIER_POSITION_FILE.to_string(),
            supplier_svg_file: SUPPLIER_SVG_FILE.to_string(),
        }
    }
}

impl GameConfig {
    /// Parse a TOML document; keys that are absent keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<GameConfig>(contents)
    }

    /// The restitution model parameters as one value.
    pub fn restitution_model(&self) -> crate::polygon::RestitutionModel {
        crate::polygon::RestitutionModel {
            scale: self.restitution_scale,
            min_mass: self.min_restitution_mass,
            max_mass: self.max_restitution_mass,
        }
    }
}

/// Startup system: attempt to load `assets/game.toml` and overwrite the
/// `GameConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults. TOML parse errors are printed
/// to stderr but do not abort the game. A missing file is silently ignored.
pub fn load_game_config(mut config: ResMut<GameConfig>) {
    let path = "assets/game.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match GameConfig::from_toml(&contents) {
            Ok(loaded) => {
                *config = loaded;
                println!("✓ Loaded game config from {path}");
            }
            Err(e) => {
                eprintln!("⚠ Failed to parse {path}: {e}; using defaults");
            }
        },
        Err(_) => {
            println!("ℹ No {path} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = GameConfig::from_toml("gravity = 500.0\nstart_level = \"bridge\"\n")
            .expect("partial config must parse");
        assert_eq!(cfg.gravity, 500.0);
        assert_eq!(cfg.start_level, LevelId::Bridge);
        assert_eq!(cfg.restitution_scale, RESTITUTION_SCALE);
        assert_eq!(cfg.button_travel, BUTTON_TRAVEL);
    }

    #[test]
    fn empty_toml_equals_defaults() {
        let cfg = GameConfig::from_toml("").expect("empty config must parse");
        assert_eq!(cfg.max_restitution_mass, MAX_RESTITUTION_MASS);
        assert_eq!(cfg.supplier_svg_file, SUPPLIER_SVG_FILE);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/game.toml");
        let contents = std::fs::read_to_string(path).expect("assets/game.toml must exist");
        let cfg = GameConfig::from_toml(&contents).expect("shipped config must parse");
        let defaults = GameConfig::default();
        assert_eq!(cfg.start_level, defaults.start_level);
        assert_eq!(cfg.gravity, defaults.gravity);
        assert_eq!(cfg.drop_outline_scale, defaults.drop_outline_scale);
        assert_eq!(cfg.outline_simplify_tolerance, defaults.outline_simplify_tolerance);
        assert!((cfg.hazard_spin_step - defaults.hazard_spin_step).abs() < 1e-6);
        assert_eq!(cfg.supplier_position_file, defaults.supplier_position_file);
    }

    #[test]
    fn unknown_level_name_is_rejected() {
        assert!(GameConfig::from_toml("start_level = \"moon\"").is_err());
    }
}

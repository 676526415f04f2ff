//! Centralised physics and gameplay constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::GameConfig`] uses them as its defaults; `assets/game.toml`
//! can override most of them at startup.

// ── Window ────────────────────────────────────────────────────────────────────

/// Initial window width in pixels.
pub const WINDOW_WIDTH: f32 = 1280.0;

/// Initial window height in pixels.
pub const WINDOW_HEIGHT: f32 = 720.0;

// ── Physics: World ────────────────────────────────────────────────────────────

/// Downward gravity (px/s²). World units are pixels (`pixels_per_meter(1.0)`).
pub const GRAVITY: f32 = 980.0;

/// Mass per square pixel used for every body without an explicit mass.
///
/// A 100×100 block weighs 10, which is the scale the button thresholds and the
/// restitution model are authored against.
pub const BODY_DENSITY: f32 = 0.001;

/// Physics ticks per second used to express speeds "per tick".
///
/// Rapier reports `linvel` in px/s; level thresholds such as "speed ≥ 10" are
/// authored per tick, so speeds are divided by this before comparison.
pub const TICKS_PER_SECOND: f32 = 60.0;

/// Friction applied to terrain and dropped shapes.
pub const DEFAULT_FRICTION: f32 = 0.1;

// ── Restitution model ─────────────────────────────────────────────────────────

/// Restitution given to the lightest dropped shapes.
/// Heavier shapes scale linearly down to 0.0 at [`MAX_RESTITUTION_MASS`].
pub const RESTITUTION_SCALE: f32 = 0.6;

/// Masses below this are treated as this value by the restitution model.
pub const MIN_RESTITUTION_MASS: f32 = 1.0;

/// Masses above this are treated as this value (restitution reaches 0.0).
pub const MAX_RESTITUTION_MASS: f32 = 80.0;

// ── Outlines ──────────────────────────────────────────────────────────────────

/// Distance in pixels between samples when flattening SVG curves.
pub const OUTLINE_SAMPLE_DENSITY: f32 = 10.0;

/// Scale applied to externally supplied drawings before they are dropped.
pub const DROP_OUTLINE_SCALE: f32 = 0.7;

/// Vertices closer than this are collapsed when cleaning an outline.
pub const OUTLINE_DEDUP_MIN_DIST: f32 = 0.5;

/// Largest deviation (px) allowed when simplifying an outline before it is validated.
pub const OUTLINE_SIMPLIFY_TOLERANCE: f32 = 2.0;

/// Penetration (px) below which two shapes only count as touching.
pub const OVERLAP_TOLERANCE: f32 = 1e-3;

/// Segment count used to approximate circles when drawing.
pub const CIRCLE_SEGMENTS: usize = 24;

/// Side length of the debug test block dropped with the right mouse button.
pub const TEST_BLOCK_SIZE: f32 = 100.0;

// ── Hazard ────────────────────────────────────────────────────────────────────

/// Number of candidate spikes distributed evenly around a hazard core.
pub const SPIKE_COUNT: usize = 12;

/// Spike length as a fraction of the core radius.
pub const SPIKE_LENGTH_FACTOR: f32 = 0.6;

/// Spike half-width as a fraction of the core radius.
pub const SPIKE_WIDTH_FACTOR: f32 = 0.2;

/// Rotation applied to a spinning hazard every tick (radians; 0.5°).
pub const HAZARD_SPIN_STEP: f32 = 0.5 * std::f32::consts::PI / 180.0;

/// Overlap depth (px) beyond which a dropped shape jams a hazard.
pub const HAZARD_JAM_DEPTH: f32 = 10.0;

/// Upward impulse the corridor hazards give whatever touches them.
pub const HAZARD_KNOCKBACK_IMPULSE: f32 = 2000.0;

// ── Button ────────────────────────────────────────────────────────────────────

/// Distance the button top travels when pressed (px).
pub const BUTTON_TRAVEL: f32 = 10.0;

/// Delay before a pressed button top returns to rest (seconds).
pub const BUTTON_RETURN_DELAY_SECS: f32 = 0.5;

// ── Character ─────────────────────────────────────────────────────────────────

/// Character sprite frame width (px) before [`CHARACTER_SCALE`].
pub const CHARACTER_FRAME_W: f32 = 375.0;

/// Character sprite frame height (px) before [`CHARACTER_SCALE`].
pub const CHARACTER_FRAME_H: f32 = 500.0;

/// Uniform scale applied to the character in every level.
pub const CHARACTER_SCALE: f32 = 0.5;

/// Restitution of the character body.
pub const CHARACTER_RESTITUTION: f32 = 0.5;

/// Friction of the character body.
pub const CHARACTER_FRICTION: f32 = 0.5;

// ── Outline supplier ──────────────────────────────────────────────────────────

/// Seconds between polls of the external position/outline files.
pub const SUPPLIER_POLL_INTERVAL_SECS: f32 = 1.0;

/// JSON file written by the capture process with the drop position and color.
pub const SUPPLIER_POSITION_FILE: &str = "output/position_color.json";

/// SVG file written by the tracing process.
pub const SUPPLIER_SVG_FILE: &str = "output/output.svg";

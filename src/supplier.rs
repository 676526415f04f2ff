//! Outline supplier: polls the files written by the capture/trace process.
//!
//! `position_color.json` holds the normalized drop position and the drawing's
//! color; the traced SVG holds the outline. Both are read off the main thread
//! on the [`IoTaskPool`]. A changed position or color produces a
//! [`DropRequest`] stamped with the level generation current when the poll
//! was issued, so a result landing after a level change is discarded. A
//! change seen before its outline exists stays pending until the tracer
//! catches up.

use crate::config::GameConfig;
use crate::drop::{ColorTag, DropRequest, DropShape};
use crate::error::{GameError, GameResult};
use crate::level::Viewport;
use crate::lifecycle::LevelManager;
use crate::svg_path;
use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future, IoTaskPool, Task};
use serde::Deserialize;

pub struct SupplierPlugin;

impl Plugin for SupplierPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OutlineSupplier>()
            .init_resource::<LatestOutline>()
            .add_systems(Update, supplier_poll_system);
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RelativePosition {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PositionFile {
    relative_position: RelativePosition,
    #[serde(default)]
    color: ColorTag,
}

/// One poll's worth of supplier output.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierSnapshot {
    /// Normalized `[0,1]²` drop position.
    pub position: Vec2,
    pub color: ColorTag,
    /// `None` while the tracer has not produced a usable path yet.
    pub outline: Option<Vec<Vec2>>,
}

/// Parse `position_color.json`.
pub fn parse_position(json: &str) -> GameResult<(Vec2, ColorTag)> {
    let file: PositionFile = serde_json::from_str(json).map_err(|e| GameError::OutlineFile {
        path: "position_color.json".to_string(),
        reason: e.to_string(),
    })?;
    let p = file.relative_position;
    Ok((Vec2::new(p.x, p.y).clamp(Vec2::ZERO, Vec2::ONE), file.color))
}

/// Parse an SVG document into the outline of its first path.
pub fn parse_svg_outline(svg: &str, sample: f32) -> GameResult<Vec<Vec2>> {
    svg_path::outline_from_svg(svg, sample)
}

fn read_file(path: &str) -> GameResult<String> {
    std::fs::read_to_string(path).map_err(|e| GameError::OutlineFile {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Blocking read of both supplier files.
pub fn read_snapshot(position_path: &str, svg_path: &str, sample: f32) -> GameResult<SupplierSnapshot> {
    let (position, color) = parse_position(&read_file(position_path)?)?;
    let outline = match read_file(svg_path).and_then(|svg| parse_svg_outline(&svg, sample)) {
        Ok(outline) => Some(outline),
        Err(err) => {
            debug!("No usable traced outline yet: {}", err);
            None
        }
    };
    Ok(SupplierSnapshot {
        position,
        color,
        outline,
    })
}

/// The most recent traced outline, used by the mouse drop.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LatestOutline(pub Option<Vec<Vec2>>);

struct PendingPoll {
    generation: u64,
    task: Task<GameResult<SupplierSnapshot>>,
}

#[derive(Resource, Default)]
pub struct OutlineSupplier {
    /// Seconds until the next poll.
    countdown: f32,
    pending: Option<PendingPoll>,
    /// Position and color of the last snapshot that became a drop.
    last: Option<(Vec2, ColorTag)>,
}

impl OutlineSupplier {
    /// The outline to drop for this snapshot, if any.
    ///
    /// A new position or color is only marked as handled once an outline
    /// comes with it; until then later polls keep offering it.
    fn accept(&mut self, snapshot: &SupplierSnapshot) -> Option<Vec<Vec2>> {
        let key = (snapshot.position, snapshot.color);
        if self.last == Some(key) {
            return None;
        }
        let outline = snapshot.outline.clone()?;
        self.last = Some(key);
        Some(outline)
    }
}

/// Poll the supplier files on an interval and turn changes into drop requests.
pub fn supplier_poll_system(
    time: Res<Time>,
    config: Res<GameConfig>,
    manager: Res<LevelManager>,
    viewport: Res<Viewport>,
    mut supplier: ResMut<OutlineSupplier>,
    mut latest: ResMut<LatestOutline>,
    mut drops: MessageWriter<DropRequest>,
) {
    if !config.supplier_enabled {
        return;
    }

    if let Some(pending) = supplier.pending.as_mut() {
        let Some(result) = block_on(future::poll_once(&mut pending.task)) else {
            return;
        };
        let generation = pending.generation;
        supplier.pending = None;

        match result {
            Ok(snapshot) => {
                if snapshot.outline.is_some() {
                    latest.0 = snapshot.outline.clone();
                }
                if let Some(outline) = supplier.accept(&snapshot) {
                    info!(
                        "Supplier: position ({:.2}, {:.2}), color {:?}",
                        snapshot.position.x, snapshot.position.y, snapshot.color
                    );
                    drops.write(DropRequest {
                        shape: DropShape::Outline(outline),
                        position: viewport.from_normalized(snapshot.position),
                        color: snapshot.color,
                        generation,
                    });
                }
            }
            Err(err) => debug!("Supplier poll failed: {}", err),
        }
    }

    supplier.countdown -= time.delta_secs();
    if supplier.countdown > 0.0 {
        return;
    }
    supplier.countdown = config.supplier_poll_interval_secs;

    let position_path = config.supplier_position_file.clone();
    let svg_path = config.supplier_svg_file.clone();
    let sample = config.outline_sample_density;
    let task = IoTaskPool::get().spawn(async move { read_snapshot(&position_path, &svg_path, sample) });
    supplier.pending = Some(PendingPoll {
        generation: manager.generation,
        task,
    });
}

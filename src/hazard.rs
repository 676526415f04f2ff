//! Spiked rotating hazards.
//!
//! A hazard is a circular core plus a contiguous arc of triangular spikes,
//! assembled as one compound body whose origin is the core centre. While its
//! [`HazardSpin`] says so, the hazard turns by a fixed step every tick; the
//! collision rules can stop it for good.

use crate::body::{rotate_to, BodyShape};
use crate::constants::{CIRCLE_SEGMENTS, SPIKE_COUNT, SPIKE_LENGTH_FACTOR, SPIKE_WIDTH_FACTOR};
use crate::geometry;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use std::f32::consts::{PI, TAU};

/// Contiguous run of spikes kept out of the [`SPIKE_COUNT`] candidates.
/// Indices wrap, so `first: 10, count: 4` keeps 10, 11, 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeArc {
    pub first: usize,
    pub count: usize,
}

impl SpikeArc {
    pub fn all() -> Self {
        Self {
            first: 0,
            count: SPIKE_COUNT,
        }
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.count.min(SPIKE_COUNT)).map(move |k| (self.first + k) % SPIKE_COUNT)
    }
}

/// CCW triangle for spike `index`, relative to the core centre.
pub fn spike_triangle(radius: f32, index: usize) -> Vec<Vec2> {
    let dir = Vec2::from_angle(TAU * index as f32 / SPIKE_COUNT as f32);
    let side = dir.perp() * radius * SPIKE_WIDTH_FACTOR;
    let base = dir * radius;
    let tip = dir * radius * (1.0 + SPIKE_LENGTH_FACTOR);
    vec![base - side, tip, base + side]
}

/// Core followed by the retained spikes, all relative to the core centre.
pub fn hazard_parts(radius: f32, spikes: SpikeArc) -> Vec<Vec<Vec2>> {
    let mut parts = vec![geometry::regular_polygon(CIRCLE_SEGMENTS, radius)];
    parts.extend(spikes.indices().map(|i| spike_triangle(radius, i)));
    parts
}

/// Build the compound hazard shape centred on `center` (world space).
pub fn hazard_shape(center: Vec2, radius: f32, spikes: SpikeArc) -> Option<BodyShape> {
    if radius <= 0.0 {
        warn!("Hazard not created: radius {} must be positive", radius);
        return None;
    }
    let parts = hazard_parts(radius, spikes);
    let mut shapes = vec![(Vec2::ZERO, 0.0, Collider::ball(radius))];
    shapes.extend(
        parts[1..]
            .iter()
            .filter_map(|spike| Collider::convex_hull(spike))
            .map(|collider| (Vec2::ZERO, 0.0, collider)),
    );
    Some(BodyShape {
        position: center,
        area: parts.iter().map(|p| geometry::area(p)).sum(),
        parts,
        collider: Collider::compound(shapes),
        sprite_offset: Vec2::ZERO,
        restitution: None,
    })
}

/// Per-hazard rotation flag. Once stopped, a hazard never restarts.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct HazardSpin {
    spinning: bool,
    /// Radians per tick, clockwise on screen.
    pub step: f32,
    /// Orbit centre; `None` spins in place about the core.
    pub pivot: Option<Vec2>,
    /// Angle reached so far, in `(-PI, PI]`.
    angle: f32,
}

impl HazardSpin {
    pub fn new(step: f32) -> Self {
        Self {
            spinning: true,
            step,
            pivot: None,
            angle: 0.0,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Advance the target angle by one step.
    fn advance(&mut self) -> f32 {
        self.angle = PI - (PI - (self.angle - self.step)).rem_euclid(TAU);
        self.angle
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    pub fn stop(&mut self) {
        self.spinning = false;
    }
}

/// Turn every spinning hazard to its next angle.
///
/// Hazards are driven to an absolute angle rather than nudged, so contact
/// pushes never accumulate into the spin.
pub fn hazard_spin_system(mut hazards: Query<(&mut HazardSpin, &mut Transform)>) {
    for (mut spin, mut transform) in hazards.iter_mut() {
        if spin.spinning {
            let angle = spin.advance();
            rotate_to(&mut transform, angle, spin.pivot);
        }
    }
}

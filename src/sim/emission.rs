//! Emission geometry
//!
//! Every emission shape is built on one primitive: `disperse`, which places
//! N evenly spaced values centered on a given value.

use std::f32::consts::TAU;

use glam::Vec2;

use super::entity::{Entity, EntityId, Sprite, Targets};
use super::motion::{Homing, MotionState};
use crate::pattern::BuildError;
use crate::settings::Tuning;
use crate::unit_from_angle;

/// N evenly spaced values, `step` apart, centered on `center`
pub fn disperse(center: f32, step: f32, n: usize) -> Vec<f32> {
    let start = center - step * (n as f32 - 1.0) / 2.0;
    (0..n).map(|i| start + step * i as f32).collect()
}

/// Ring of N headings; `offset` in [0, 1) rotates the ring by a fraction of
/// one slot
pub fn radial_angles(n: usize, offset: f32) -> Vec<f32> {
    let slot = TAU / n as f32;
    (0..n).map(|i| slot * (i as f32 + offset)).collect()
}

/// N consecutive headings of a virtual `base_n` ring, centered on `direction`
pub fn burst_angles(base_n: usize, n: usize, direction: f32) -> Vec<f32> {
    disperse(direction, TAU / base_n as f32, n)
}

/// Perpendicular offsets of a wall of N bullets spaced `sep` apart
pub fn plane_offsets(n: usize, sep: f32) -> Vec<f32> {
    disperse(0.0, sep, n)
}

/// Emission shape parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Radial {
        count: usize,
        offset: f32,
    },
    Burst {
        base_count: usize,
        count: usize,
        direction: f32,
    },
    Plane {
        count: usize,
        separation: f32,
        direction: f32,
    },
}

impl Shape {
    pub fn count(&self) -> usize {
        match *self {
            Shape::Radial { count, .. }
            | Shape::Burst { count, .. }
            | Shape::Plane { count, .. } => count,
        }
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.count() == 0 {
            return Err(BuildError::invalid("N", "emission count must be at least 1"));
        }
        match *self {
            Shape::Burst {
                base_count, count, ..
            } if count > base_count => Err(BuildError::invalid(
                "N",
                format!("burst of {count} exceeds its base ring of {base_count}"),
            )),
            _ => Ok(()),
        }
    }
}

/// A bullet emitter: one shape fired from one origin
#[derive(Debug, Clone)]
pub struct Emitter {
    pub origin: Vec2,
    /// Bullet speed (pixels per tick)
    pub speed: f32,
    pub shape: Shape,
    pub sprite: Sprite,
    /// Entity every bullet homes in on (plane emitters also aim at it)
    pub track: Option<EntityId>,
}

impl Emitter {
    /// Spawn position and initial velocity of every bullet
    pub fn seeds(&self, targets: &dyn Targets) -> Vec<(Vec2, Vec2)> {
        match self.shape {
            Shape::Radial { count, offset } => radial_angles(count, offset)
                .into_iter()
                .map(|theta| (self.origin, unit_from_angle(theta) * self.speed))
                .collect(),
            Shape::Burst {
                base_count,
                count,
                direction,
            } => burst_angles(base_count, count, direction)
                .into_iter()
                .map(|theta| (self.origin, unit_from_angle(theta) * self.speed))
                .collect(),
            Shape::Plane {
                count,
                separation,
                direction,
            } => {
                let heading = self
                    .track
                    .and_then(|id| targets.position_of(id))
                    .map(|target| (target - self.origin).normalize_or_zero())
                    .filter(|v| *v != Vec2::ZERO)
                    .unwrap_or_else(|| unit_from_angle(direction));
                let across = heading.perp();
                plane_offsets(count, separation)
                    .into_iter()
                    .map(|d| (self.origin + across * d, heading * self.speed))
                    .collect()
            }
        }
    }

    /// Build the bullets, homing if a target is set
    pub fn emit(&self, targets: &dyn Targets, tuning: &Tuning) -> Vec<Entity> {
        self.seeds(targets)
            .into_iter()
            .map(|(pos, vel)| {
                let motion = match self.track {
                    Some(id) => MotionState::Homing(Homing::new(vel, id, 0, tuning)),
                    None => MotionState::Velocity { vel },
                };
                Entity::new(pos, motion, self.sprite)
            })
            .collect()
    }
}

//! Danmaku - a data-driven bullet pattern simulator
//!
//! Core modules:
//! - `pattern`: Declarative pattern files -> live objects (registry + builder)
//! - `sim`: Simulation (geometry, motion, entities, per-tick pipeline)
//! - `settings`: Tunables and run configuration
//! - `highscores`: Top-5 score list

pub mod highscores;
pub mod pattern;
pub mod settings;
pub mod sim;

pub use highscores::HighScores;
pub use pattern::{BuildError, Built, ErrorKind, ObjectBuilder, PatternNode, Registry};
pub use settings::{Difficulty, Settings, Tuning};

use glam::Vec2;

/// Simulation configuration constants (defaults for `Tuning`/`Settings`)
pub mod consts {
    /// Simulation ticks per second
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Viewport dimensions
    pub const VIEWPORT_WIDTH: f32 = 1200.0;
    pub const VIEWPORT_HEIGHT: f32 = 900.0;

    /// Entities further than this outside the viewport are culled
    pub const CULL_MARGIN: f32 = 32.0;

    /// Player defaults
    pub const PLAYER_SPEED: f32 = 5.0;
    pub const PLAYER_SIZE: f32 = 20.0;
    /// Divisor applied to player speed while the slow modifier is held
    pub const SPEED_AMPLIFIER: f32 = 2.0;

    /// Homing: distance budget (pixels) a bullet may spend tracking
    pub const TRACK_BUDGET: f32 = 600.0;
    /// Homing: hard cap on tracking time
    pub const MAX_TRACK_SECS: f32 = 2.0;
    /// Homing: maximum heading change per tick (radians)
    pub const TURN_STEP: f32 = 0.05;
    /// Homing: heading errors below this snap straight onto the target
    pub const SNAP_THRESHOLD: f32 = 0.05;

    /// Default emission direction (straight down the screen)
    pub const DEFAULT_DIRECTION: f32 = std::f32::consts::FRAC_PI_2;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `theta`
#[inline]
pub fn unit_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Heading of a vector (radians, atan2 convention)
#[inline]
pub fn heading_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

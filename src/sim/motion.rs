//! Motion models
//!
//! A closed set of motion variants. Each advances one tick given the current
//! position; only `Homing` reads anything outside itself (a target position,
//! looked up read-only each tick).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, Targets};
use super::viewport::Rect;
use crate::settings::Tuning;
use crate::{heading_of, normalize_angle, unit_from_angle};

/// Keys the player-controlled mover reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    /// Speed modifier (precise movement while held)
    Slow,
}

impl Key {
    pub const DIRECTIONS: [Key; 4] = [Key::Left, Key::Right, Key::Up, Key::Down];

    /// Screen-space unit direction (y grows downward)
    pub fn direction(&self) -> Option<Vec2> {
        match self {
            Key::Left => Some(Vec2::NEG_X),
            Key::Right => Some(Vec2::X),
            Key::Up => Some(Vec2::NEG_Y),
            Key::Down => Some(Vec2::Y),
            Key::Slow => None,
        }
    }

    fn slot(&self) -> Option<usize> {
        Key::DIRECTIONS.iter().position(|k| k == self)
    }
}

/// A single input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

/// Keyboard-driven motion confined to `bounds`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerControl {
    pub vel: Vec2,
    pub magnitude: f32,
    pub bounds: Rect,
    amplifier: f32,
    held: [bool; 4],
    slowed: bool,
}

impl PlayerControl {
    pub fn new(magnitude: f32, bounds: Rect, amplifier: f32) -> Self {
        Self {
            vel: Vec2::ZERO,
            magnitude,
            bounds,
            amplifier,
            held: [false; 4],
            slowed: false,
        }
    }

    pub fn is_slowed(&self) -> bool {
        self.slowed
    }

    /// Apply one key event.
    ///
    /// Both the speed modifier and the direction keys are latches: a repeated
    /// key-down or an unmatched key-up is ignored, so the velocity is always
    /// `magnitude` times the sum of the held directions.
    pub fn apply(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Down(Key::Slow) => {
                if !self.slowed {
                    self.slowed = true;
                    self.magnitude /= self.amplifier;
                }
            }
            KeyEvent::Up(Key::Slow) => {
                if self.slowed {
                    self.slowed = false;
                    self.magnitude *= self.amplifier;
                }
            }
            KeyEvent::Down(key) => {
                if let Some(i) = key.slot() {
                    self.held[i] = true;
                }
            }
            KeyEvent::Up(key) => {
                if let Some(i) = key.slot() {
                    self.held[i] = false;
                }
            }
        }

        let dir: Vec2 = Key::DIRECTIONS
            .iter()
            .zip(self.held)
            .filter(|(_, held)| *held)
            .filter_map(|(key, _)| key.direction())
            .sum();
        self.vel = dir * self.magnitude;
    }

    /// Move by `vel`, discarding the move (not the velocity) if it would
    /// leave `bounds`
    fn step(&self, position: &mut Vec2) {
        let next = *position + self.vel;
        if self.bounds.contains(next) {
            *position = next;
        }
    }
}

/// Rate-limited tracking toward another entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homing {
    pub vel: Vec2,
    pub speed: f32,
    /// Current heading (radians)
    pub heading: f32,
    /// Entity being tracked (lookup only)
    pub target: EntityId,
    /// Last tick on which the heading is still steered
    pub active_until: u32,
    turn_step: f32,
    snap_threshold: f32,
}

impl Homing {
    /// Start tracking `target`, launching with velocity `vel` at `spawn_tick`
    pub fn new(vel: Vec2, target: EntityId, spawn_tick: u32, tuning: &Tuning) -> Self {
        let speed = vel.length();
        let window_secs = if speed > 0.0 {
            (tuning.track_budget / speed).min(tuning.max_track_secs)
        } else {
            0.0
        };
        let window_ticks = (window_secs * tuning.ticks_per_second as f32) as u32;

        Self {
            vel,
            speed,
            heading: heading_of(vel),
            target,
            active_until: spawn_tick + window_ticks,
            turn_step: tuning.turn_step,
            snap_threshold: tuning.snap_threshold,
        }
    }

    pub fn is_active(&self, tick: u32) -> bool {
        tick <= self.active_until
    }

    /// Turn toward `target_pos` by at most one step
    fn steer(&mut self, position: Vec2, target_pos: Vec2) {
        let to_target = target_pos - position;
        if to_target.length_squared() <= f32::EPSILON {
            return;
        }

        let desired = heading_of(to_target);
        let error = normalize_angle(desired - self.heading);
        if error.abs() <= self.snap_threshold {
            self.heading = desired;
        } else {
            let cross = unit_from_angle(self.heading).perp_dot(unit_from_angle(desired));
            let sign = if cross >= 0.0 { 1.0 } else { -1.0 };
            self.heading = normalize_angle(self.heading + sign * self.turn_step);
        }
        self.vel = unit_from_angle(self.heading) * self.speed;
    }
}

/// Motion state of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionState {
    /// Never moves
    Constant,
    /// Straight line
    Velocity { vel: Vec2 },
    /// Velocity changes by `acc` every tick, before moving
    Acceleration { vel: Vec2, acc: Vec2 },
    /// Keyboard driven
    PlayerControlled(PlayerControl),
    /// Tracks a target for a limited window, then flies straight
    Homing(Homing),
}

impl MotionState {
    /// Advance one tick
    pub fn advance(&mut self, position: &mut Vec2, tick: u32, targets: &dyn Targets) {
        match self {
            MotionState::Constant => {}
            MotionState::Velocity { vel } => *position += *vel,
            MotionState::Acceleration { vel, acc } => {
                *vel += *acc;
                *position += *vel;
            }
            MotionState::PlayerControlled(control) => control.step(position),
            MotionState::Homing(homing) => {
                if !homing.is_active(tick) {
                    let vel = homing.vel;
                    *self = MotionState::Velocity { vel };
                    *position += vel;
                    return;
                }
                if let Some(target_pos) = targets.position_of(homing.target) {
                    homing.steer(*position, target_pos);
                }
                *position += homing.vel;
            }
        }
    }

    /// Current velocity
    pub fn velocity(&self) -> Vec2 {
        match self {
            MotionState::Constant => Vec2::ZERO,
            MotionState::Velocity { vel } | MotionState::Acceleration { vel, .. } => *vel,
            MotionState::PlayerControlled(control) => control.vel,
            MotionState::Homing(homing) => homing.vel,
        }
    }

    /// Feed a key event; returns false if this motion ignores input
    pub fn apply_key(&mut self, event: KeyEvent) -> bool {
        match self {
            MotionState::PlayerControlled(control) => {
                control.apply(event);
                true
            }
            _ => false,
        }
    }

    pub fn is_player_controlled(&self) -> bool {
        matches!(self, MotionState::PlayerControlled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::TargetSnapshot;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn no_targets() -> TargetSnapshot {
        TargetSnapshot::default()
    }

    #[test]
    fn test_constant_and_velocity() {
        let targets = no_targets();
        let mut pos = Vec2::new(1.0, 1.0);
        MotionState::Constant.advance(&mut pos, 1, &targets);
        assert_eq!(pos, Vec2::new(1.0, 1.0));

        let mut motion = MotionState::Velocity {
            vel: Vec2::new(2.0, -1.0),
        };
        motion.advance(&mut pos, 1, &targets);
        motion.advance(&mut pos, 2, &targets);
        assert_eq!(pos, Vec2::new(5.0, -1.0));
    }

    #[test]
    fn test_acceleration_applies_new_velocity_same_tick() {
        let targets = no_targets();
        let mut pos = Vec2::ZERO;
        let mut motion = MotionState::Acceleration {
            vel: Vec2::new(1.0, 0.0),
            acc: Vec2::new(0.5, 0.0),
        };
        motion.advance(&mut pos, 1, &targets);
        assert_eq!(pos, Vec2::new(1.5, 0.0));
        motion.advance(&mut pos, 2, &targets);
        assert_eq!(pos, Vec2::new(3.5, 0.0));
        assert_eq!(motion.velocity(), Vec2::new(2.0, 0.0));
    }

    fn short_window() -> Tuning {
        Tuning {
            ticks_per_second: 10,
            max_track_secs: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_homing_window_length() {
        let tuning = Tuning::default();
        // 600 / 1000 = 0.6s < 2s cap
        let h = Homing::new(Vec2::new(1000.0, 0.0), EntityId(1), 10, &tuning);
        assert_eq!(h.active_until, 10 + 36);
        // 600 / 1 = 600s, capped at 2s
        let h = Homing::new(Vec2::new(1.0, 0.0), EntityId(1), 0, &tuning);
        assert_eq!(h.active_until, 120);
    }

    #[test]
    fn test_homing_freezes_after_window() {
        let tuning = short_window();
        let target = EntityId(9);
        let mut targets = TargetSnapshot::default();
        targets.insert(target, Vec2::new(10.0, 0.0));

        let mut pos = Vec2::ZERO;
        let mut motion =
            MotionState::Homing(Homing::new(Vec2::new(1.0, 0.0), target, 0, &tuning));
        for tick in 1..=5 {
            motion.advance(&mut pos, tick, &targets);
        }
        assert!((pos - Vec2::new(5.0, 0.0)).length() < 1e-4);

        // Target moves away after the window closes
        targets.insert(target, Vec2::new(0.0, 100.0));
        for tick in 6..=20 {
            motion.advance(&mut pos, tick, &targets);
        }
        assert!(matches!(motion, MotionState::Velocity { .. }));
        let vel = motion.velocity();
        assert!(heading_of(vel).abs() < 1e-6);
        assert!((pos - Vec2::new(20.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_homing_turn_is_rate_limited() {
        let tuning = Tuning::default();
        let target = EntityId(3);
        let mut targets = TargetSnapshot::default();
        targets.insert(target, Vec2::new(0.0, 100.0));

        let mut pos = Vec2::ZERO;
        let mut motion =
            MotionState::Homing(Homing::new(Vec2::new(2.0, 0.0), target, 0, &tuning));
        motion.advance(&mut pos, 1, &targets);

        let MotionState::Homing(h) = &motion else {
            panic!("still homing");
        };
        assert!((h.heading - tuning.turn_step).abs() < 1e-6);
        assert!((h.vel.length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_homing_turns_the_short_way() {
        let tuning = Tuning::default();
        let target = EntityId(3);
        let mut targets = TargetSnapshot::default();
        // Target is clockwise (negative angle) from a +x heading
        targets.insert(target, Vec2::new(0.0, -100.0));

        let mut pos = Vec2::ZERO;
        let mut motion =
            MotionState::Homing(Homing::new(Vec2::new(1.0, 0.0), target, 0, &tuning));
        motion.advance(&mut pos, 1, &targets);
        let MotionState::Homing(h) = &motion else {
            panic!("still homing");
        };
        assert!((h.heading + tuning.turn_step).abs() < 1e-6);
    }

    #[test]
    fn test_homing_converges_on_target_heading() {
        let tuning = Tuning::default();
        let target = EntityId(3);
        let mut targets = TargetSnapshot::default();
        targets.insert(target, Vec2::new(0.0, 1.0e6));

        let mut pos = Vec2::ZERO;
        let mut motion =
            MotionState::Homing(Homing::new(Vec2::new(1.0, 0.0), target, 0, &tuning));
        for tick in 1..=60 {
            motion.advance(&mut pos, tick, &targets);
        }
        let MotionState::Homing(h) = &motion else {
            panic!("still homing");
        };
        assert!((h.heading - FRAC_PI_2).abs() < 0.01);
    }

    #[test]
    fn test_homing_zero_speed_never_engages() {
        let tuning = Tuning::default();
        let target = EntityId(3);
        let mut targets = TargetSnapshot::default();
        targets.insert(target, Vec2::new(5.0, 5.0));

        let h = Homing::new(Vec2::ZERO, target, 4, &tuning);
        assert_eq!(h.active_until, 4);

        let mut pos = Vec2::ZERO;
        let mut motion = MotionState::Homing(h);
        motion.advance(&mut pos, 5, &targets);
        assert_eq!(motion, MotionState::Velocity { vel: Vec2::ZERO });
        assert_eq!(pos, Vec2::ZERO);
    }

    #[test]
    fn test_homing_missing_target_flies_straight() {
        let tuning = Tuning::default();
        let mut pos = Vec2::ZERO;
        let mut motion =
            MotionState::Homing(Homing::new(Vec2::new(0.0, 3.0), EntityId(42), 0, &tuning));
        motion.advance(&mut pos, 1, &no_targets());
        assert_eq!(pos, Vec2::new(0.0, 3.0));
    }

    fn player(at_bounds: Rect) -> MotionState {
        MotionState::PlayerControlled(PlayerControl::new(5.0, at_bounds, 2.0))
    }

    #[test]
    fn test_player_pressing_into_wall_stays_pinned() {
        let targets = no_targets();
        let bounds = Rect::from_size(100.0, 100.0);
        let mut motion = player(bounds);
        let mut pos = Vec2::new(2.0, 50.0);

        motion.apply_key(KeyEvent::Down(Key::Left));
        for tick in 1..=10 {
            motion.advance(&mut pos, tick, &targets);
            assert_eq!(pos, Vec2::new(2.0, 50.0));
        }
        // Velocity is retained while pinned
        assert_eq!(motion.velocity(), Vec2::new(-5.0, 0.0));

        motion.apply_key(KeyEvent::Up(Key::Left));
        motion.apply_key(KeyEvent::Down(Key::Right));
        motion.advance(&mut pos, 11, &targets);
        assert_eq!(pos, Vec2::new(7.0, 50.0));
    }

    #[test]
    fn test_player_diagonal_and_release() {
        let targets = no_targets();
        let mut motion = player(Rect::from_size(100.0, 100.0));
        let mut pos = Vec2::new(50.0, 50.0);
        motion.apply_key(KeyEvent::Down(Key::Right));
        motion.apply_key(KeyEvent::Down(Key::Up));
        motion.advance(&mut pos, 1, &targets);
        assert_eq!(pos, Vec2::new(55.0, 45.0));

        motion.apply_key(KeyEvent::Up(Key::Right));
        motion.apply_key(KeyEvent::Up(Key::Up));
        motion.advance(&mut pos, 2, &targets);
        assert_eq!(pos, Vec2::new(55.0, 45.0));
    }

    #[test]
    fn test_slow_modifier_is_a_latch() {
        let mut control = PlayerControl::new(4.0, Rect::from_size(100.0, 100.0), 2.0);
        control.apply(KeyEvent::Down(Key::Right));
        control.apply(KeyEvent::Down(Key::Slow));
        control.apply(KeyEvent::Down(Key::Slow));
        assert!(control.is_slowed());
        assert_eq!(control.magnitude, 2.0);
        assert_eq!(control.vel, Vec2::new(2.0, 0.0));

        control.apply(KeyEvent::Up(Key::Slow));
        control.apply(KeyEvent::Up(Key::Slow));
        assert_eq!(control.magnitude, 4.0);
        assert_eq!(control.vel, Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_repeated_direction_down_does_not_stack() {
        let mut control = PlayerControl::new(3.0, Rect::from_size(100.0, 100.0), 2.0);
        control.apply(KeyEvent::Down(Key::Down));
        control.apply(KeyEvent::Down(Key::Down));
        assert_eq!(control.vel, Vec2::new(0.0, 3.0));
        control.apply(KeyEvent::Up(Key::Left));
        assert_eq!(control.vel, Vec2::new(0.0, 3.0));
    }

    fn key_strategy() -> impl Strategy<Value = Key> {
        prop_oneof![
            Just(Key::Left),
            Just(Key::Right),
            Just(Key::Up),
            Just(Key::Down),
            Just(Key::Slow),
        ]
    }

    fn event_strategy() -> impl Strategy<Value = Option<KeyEvent>> {
        prop_oneof![
            Just(None),
            key_strategy().prop_map(|k| Some(KeyEvent::Down(k))),
            key_strategy().prop_map(|k| Some(KeyEvent::Up(k))),
        ]
    }

    proptest! {
        #[test]
        fn prop_player_never_leaves_bounds(
            start_x in 0.0f32..=100.0,
            start_y in 0.0f32..=60.0,
            magnitude in 0.1f32..40.0,
            events in proptest::collection::vec(event_strategy(), 1..200),
        ) {
            let targets = no_targets();
            let bounds = Rect::from_size(100.0, 60.0);
            let mut motion = MotionState::PlayerControlled(
                PlayerControl::new(magnitude, bounds, 2.0),
            );
            let mut pos = Vec2::new(start_x, start_y);
            for (i, event) in events.into_iter().enumerate() {
                if let Some(event) = event {
                    motion.apply_key(event);
                }
                motion.advance(&mut pos, i as u32 + 1, &targets);
                prop_assert!(bounds.contains(pos));
            }
        }
    }
}

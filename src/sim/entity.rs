//! Entities: bullets, enemies, spawners and the player
//!
//! An entity is a position plus a motion state plus a sprite. Spawners are
//! plain entities carrying a `Spawner` component with emission rules.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::color::Rgb;
use super::motion::MotionState;
use super::viewport::Rect;
use crate::pattern::Factory;

/// Stable entity identifier (0 = not yet inserted into a collection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const UNASSIGNED: EntityId = EntityId(0);
}

/// Read-only position lookup used by homing and aimed emitters
pub trait Targets {
    fn position_of(&self, id: EntityId) -> Option<Vec2>;
}

/// Positions of every live entity, frozen at the start of a tick
#[derive(Debug, Clone, Default)]
pub struct TargetSnapshot {
    positions: HashMap<EntityId, Vec2>,
}

impl TargetSnapshot {
    pub fn insert(&mut self, id: EntityId, pos: Vec2) {
        self.positions.insert(id, pos);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Targets for TargetSnapshot {
    fn position_of(&self, id: EntityId) -> Option<Vec2> {
        self.positions.get(&id).copied()
    }
}

/// A tracked entity as seen by the pattern builder
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRef {
    pub name: String,
    pub id: EntityId,
}

/// Solid rectangle sprite; its size doubles as the hit box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub width: f32,
    pub height: f32,
    pub color: Rgb,
}

impl Sprite {
    pub fn block(width: f32, height: f32, color: Rgb) -> Self {
        Self {
            width,
            height,
            color,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// When an emission rule fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Every `n` ticks of the spawner's own tick count
    Every(u32),
    /// Once, when the spawner is destroyed
    OnDestruction,
}

impl Period {
    /// Decode the pattern-file `refresh` value (-1 = on destruction)
    pub fn from_refresh(refresh: i64) -> Option<Self> {
        match refresh {
            -1 => Some(Period::OnDestruction),
            n if n > 0 => u32::try_from(n).ok().map(Period::Every),
            _ => None,
        }
    }
}

/// A spawner's sub-pattern trigger
#[derive(Debug, Clone)]
pub struct EmissionRule {
    pub period: Period,
    /// Deferred pattern; called with the spawner's position
    pub factory: Factory,
}

/// Emission component
#[derive(Debug, Clone)]
pub struct Spawner {
    /// Collection receiving emitted entities
    pub target: String,
    pub rules: Vec<EmissionRule>,
}

impl Spawner {
    /// Periodic rules due at `tick`
    pub fn due(&self, tick: u32) -> impl Iterator<Item = &Factory> {
        self.rules.iter().filter_map(move |rule| match rule.period {
            Period::Every(n) if n > 0 && tick % n == 0 => Some(&rule.factory),
            _ => None,
        })
    }

    /// Remove and return the on-destruction rules (so they fire only once)
    pub fn take_destruction_rules(&mut self) -> Vec<Factory> {
        let (fire, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.rules)
            .into_iter()
            .partition(|rule| rule.period == Period::OnDestruction);
        self.rules = keep;
        fire.into_iter().map(|rule| rule.factory).collect()
    }
}

/// Capability contract shared by everything that moves on screen
pub trait Body {
    fn position(&self) -> Vec2;
    /// Advance one tick
    fn advance(&mut self, targets: &dyn Targets);
    fn in_bounds(&self, bounds: &Rect) -> bool;
}

/// A simulated entity
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub motion: MotionState,
    pub sprite: Sprite,
    /// Ticks lived (incremented before each advance)
    pub tick_count: u32,
    pub alive: bool,
    pub spawner: Option<Spawner>,
}

impl Entity {
    pub fn new(position: Vec2, motion: MotionState, sprite: Sprite) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            position,
            motion,
            sprite,
            tick_count: 0,
            alive: true,
            spawner: None,
        }
    }

    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Hit box centered on the position
    pub fn hit_box(&self) -> Rect {
        Rect::centered(self.position, self.sprite.size())
    }

    /// Mark for removal; returns false if already dead
    pub fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }
}

impl Body for Entity {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn advance(&mut self, targets: &dyn Targets) {
        self.tick_count += 1;
        self.motion
            .advance(&mut self.position, self.tick_count, targets);
    }

    fn in_bounds(&self, bounds: &Rect) -> bool {
        bounds.contains(self.position)
    }
}

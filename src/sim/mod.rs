//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod color;
pub mod emission;
pub mod entity;
pub mod motion;
pub mod sequence;
pub mod state;
pub mod tick;
pub mod viewport;

pub use collision::{Contact, find_contacts};
pub use emission::{Emitter, Shape, burst_angles, disperse, plane_offsets, radial_angles};
pub use entity::{Body, EmissionRule, Entity, EntityId, Period, Spawner, Sprite, TargetSnapshot, Targets};
pub use motion::{Homing, Key, KeyEvent, MotionState, PlayerControl};
pub use sequence::{Sequence, Stage};
pub use state::{Collection, SceneView, SimEvent, World};
pub use tick::{TickInput, tick};
pub use viewport::{Rect, resolve_position};

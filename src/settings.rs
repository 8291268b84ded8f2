//! Run settings and simulation tunables
//!
//! Loaded from a JSON file; every field falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Multiplier applied to every bullet speed read from pattern files
    pub fn bullet_speed_scale(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.3,
        }
    }
}

/// Motion tunables, passed explicitly into every constructor that needs them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub ticks_per_second: u32,
    /// Player speed divisor while the slow modifier is held
    pub speed_amplifier: f32,
    /// Player speed (pixels per tick per held direction)
    pub player_speed: f32,
    /// Distance a homing bullet may travel while tracking
    pub track_budget: f32,
    /// Upper bound on the tracking window (seconds)
    pub max_track_secs: f32,
    /// Maximum homing turn per tick (radians)
    pub turn_step: f32,
    /// Homing snaps to the target heading below this error (radians)
    pub snap_threshold: f32,
    /// Scale applied to bullet speeds (set from difficulty)
    pub bullet_speed_scale: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ticks_per_second: TICKS_PER_SECOND,
            speed_amplifier: SPEED_AMPLIFIER,
            player_speed: PLAYER_SPEED,
            track_budget: TRACK_BUDGET,
            max_track_secs: MAX_TRACK_SECS,
            turn_step: TURN_STEP,
            snap_threshold: SNAP_THRESHOLD,
            bullet_speed_scale: 1.0,
        }
    }
}

/// Pairwise collision check between two named collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRule {
    pub left: String,
    pub right: String,
    /// Kill the left-hand entity on contact
    #[serde(default)]
    pub kill_left: bool,
    /// Kill the right-hand entity on contact
    #[serde(default)]
    pub kill_right: bool,
}

/// Run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub cull_margin: f32,
    /// Collections created at world start
    pub collections: Vec<String>,
    pub collisions: Vec<CollisionRule>,
    /// Headless runner stops after this many ticks
    pub max_ticks: u32,
    /// Fixed RNG seed (random when absent)
    pub seed: Option<u64>,
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            cull_margin: CULL_MARGIN,
            collections: ["player", "enemy", "danmaku", "bullet"]
                .into_iter()
                .map(String::from)
                .collect(),
            collisions: vec![
                CollisionRule {
                    left: "player".to_string(),
                    right: "danmaku".to_string(),
                    kill_left: false,
                    kill_right: true,
                },
                CollisionRule {
                    left: "bullet".to_string(),
                    right: "enemy".to_string(),
                    kill_left: true,
                    kill_right: true,
                },
            ],
            max_ticks: 60 * TICKS_PER_SECOND,
            seed: None,
            tuning: Tuning::default(),
        }
    }
}

impl Settings {
    /// Create settings for a difficulty (applies difficulty defaults)
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let mut settings = Self::default();
        settings.apply_difficulty(difficulty);
        settings
    }

    /// Apply a difficulty (updates difficulty-dependent tunables)
    pub fn apply_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.tuning.bullet_speed_scale = difficulty.bullet_speed_scale();
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<Settings>(&json) {
                Ok(mut settings) => {
                    settings.apply_difficulty(settings.difficulty);
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring malformed settings {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Viewport size, with any non-finite or non-positive dimension
    /// replaced by its default
    pub fn viewport_size(&self) -> (f32, f32) {
        let checked = |name: &str, value: f32, default: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                log::warn!("Invalid {} {}, using {}", name, value, default);
                default
            }
        };
        (
            checked("viewport_width", self.viewport_width, VIEWPORT_WIDTH),
            checked("viewport_height", self.viewport_height, VIEWPORT_HEIGHT),
        )
    }
}

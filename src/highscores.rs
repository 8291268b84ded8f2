//! High score list
//!
//! Persisted as a plain JSON array of the top 5 scores, descending.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 5;

/// High score list (sorted descending)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "Vec<u64>", into = "Vec<u64>")]
pub struct HighScores {
    scores: Vec<u64>,
}

impl From<Vec<u64>> for HighScores {
    fn from(mut scores: Vec<u64>) -> Self {
        scores.sort_unstable_by(|a, b| b.cmp(a));
        scores.truncate(MAX_HIGH_SCORES);
        Self { scores }
    }
}

impl From<HighScores> for Vec<u64> {
    fn from(high_scores: HighScores) -> Self {
        high_scores.scores
    }
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scores(&self) -> &[u64] {
        &self.scores
    }

    /// Check if a score qualifies for the list
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.scores.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.scores.last().is_none_or(|lowest| score > *lowest)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.scores.iter().position(|s| score > *s);
        Some(rank.unwrap_or(self.scores.len()) + 1)
    }

    /// Add a score if it qualifies; returns the rank achieved (1-indexed)
    pub fn add_score(&mut self, score: u64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        self.scores.insert(rank - 1, score);
        self.scores.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.scores.first().copied()
    }

    /// Load from a JSON file; a missing or malformed file starts fresh
    pub fn load(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            log::info!("No high scores found, starting fresh");
            return Self::new();
        };
        match serde_json::from_str::<Self>(&json) {
            Ok(scores) => {
                log::info!("Loaded {} high scores", scores.scores.len());
                scores
            }
            Err(e) => {
                log::warn!("Ignoring malformed high scores {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("High scores saved ({} entries)", self.scores.len());
        Ok(())
    }
}

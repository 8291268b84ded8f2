//! Timed stage sequences

use crate::pattern::Built;

/// A payload released `delay` ticks into its sequence
#[derive(Debug, Clone)]
pub struct Stage {
    pub delay: u32,
    pub payload: Box<Built>,
}

/// An ordered run of stages spawned into one collection
#[derive(Debug, Clone)]
pub struct Sequence {
    pub group: String,
    /// Sorted by descending delay so the next stage is at the back
    stages: Vec<Stage>,
    frame: u32,
}

impl Sequence {
    pub fn new(group: impl Into<String>, mut stages: Vec<Stage>, offset: u32) -> Self {
        for stage in &mut stages {
            stage.delay = stage.delay.saturating_add(offset);
        }
        stages.sort_by(|a, b| b.delay.cmp(&a.delay));
        Self {
            group: group.into(),
            stages,
            frame: 0,
        }
    }

    /// Payloads due this tick; advances the sequence's frame counter
    pub fn release(&mut self) -> Vec<Built> {
        let mut due = Vec::new();
        while self.stages.last().is_some_and(|s| s.delay <= self.frame) {
            if let Some(stage) = self.stages.pop() {
                due.push(*stage.payload);
            }
        }
        self.frame += 1;
        due
    }

    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    pub fn is_finished(&self) -> bool {
        self.stages.is_empty()
    }
}

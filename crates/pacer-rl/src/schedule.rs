//! Exploration-rate decay schedule

use serde::{Deserialize, Serialize};

use pacer_core::{defaults, ACTIONS_N};

/// Multiplicative epsilon decay with a hard floor.
///
/// Decay only starts once `step_count` exceeds `warmup_steps`, i.e. after
/// every action has had its cold-start trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecaySchedule {
    pub min: f64,
    pub decay: f64,
    pub warmup_steps: u64,
}

impl DecaySchedule {
    pub fn new(min: f64, decay: f64) -> Self {
        Self {
            min,
            decay,
            warmup_steps: ACTIONS_N as u64,
        }
    }

    /// Epsilon to use after `step_count` completed cycles
    pub fn step(&self, epsilon: f64, step_count: u64) -> f64 {
        if step_count <= self.warmup_steps || epsilon <= self.min {
            return epsilon;
        }
        (epsilon * self.decay).max(self.min)
    }
}

impl Default for DecaySchedule {
    fn default() -> Self {
        Self::new(defaults::EPSILON_MIN, defaults::EPSILON_DECAY)
    }
}

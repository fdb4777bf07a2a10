//! Bandit policy trait and the epsilon-greedy implementation

use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use pacer_core::defaults;

use crate::state::{Action, Reward, ValueTable};

/// Trait for stateless (single-state) bandit policies
pub trait BanditPolicy: Send + Sync {
    /// Policy name
    fn name(&self) -> &str;

    /// Choose an action given the current values and exploration rate
    fn select(&self, table: &ValueTable, epsilon: f64, rng: &mut dyn RngCore) -> Action;

    /// Fold a reward for `action` into the table
    fn update(&self, table: &mut ValueTable, action: Action, reward: Reward);

    /// Get policy parameters as JSON
    fn get_params(&self) -> serde_json::Value;

    /// Set policy parameters from JSON
    fn set_params(&mut self, params: serde_json::Value) -> Result<()>;
}

/// Epsilon-greedy selection over an exponential-moving-average value table
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    learning_rate: f64,
}

impl EpsilonGreedy {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl BanditPolicy for EpsilonGreedy {
    fn name(&self) -> &str {
        "epsilon_greedy"
    }

    fn select(&self, table: &ValueTable, epsilon: f64, rng: &mut dyn RngCore) -> Action {
        let candidates: Vec<Action> = if rng.gen::<f64>() < epsilon {
            Action::all().collect()
        } else {
            // Ties are broken uniformly, not towards the lowest id
            table.argmax_set()
        };

        candidates
            .choose(rng)
            .copied()
            .unwrap_or_else(|| table.best_action())
    }

    fn update(&self, table: &mut ValueTable, action: Action, reward: Reward) {
        let old = table.get(action);
        table.set(
            action,
            (1.0 - self.learning_rate) * old + self.learning_rate * reward,
        );
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "learning_rate": self.learning_rate,
        })
    }

    fn set_params(&mut self, params: serde_json::Value) -> Result<()> {
        if let Some(lr) = params["learning_rate"].as_f64() {
            if !(lr > 0.0 && lr <= 1.0) {
                return Err(anyhow!("learning_rate must be in (0, 1], got {lr}"));
            }
            self.learning_rate = lr;
        }
        Ok(())
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new(defaults::LEARNING_RATE)
    }
}

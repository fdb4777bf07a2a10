//! Pacing engine - owns the controller state and drives selection and learning

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pacer_core::defaults;

use crate::algorithm::{BanditPolicy, EpsilonGreedy};
use crate::experience::Experience;
use crate::reward::RewardSignal;
use crate::schedule::DecaySchedule;
use crate::state::{Action, ControllerState};

/// Learning parameters for the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub learning_rate: f64,
    pub epsilon_init: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    /// Fixed RNG seed for reproducible selection
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learning_rate: defaults::LEARNING_RATE,
            epsilon_init: defaults::EPSILON_INIT,
            epsilon_min: defaults::EPSILON_MIN,
            epsilon_decay: defaults::EPSILON_DECAY,
            seed: None,
        }
    }
}

/// Epsilon-greedy pacing controller
pub struct PacingEngine {
    policy: Box<dyn BanditPolicy>,
    schedule: DecaySchedule,
    state: ControllerState,
    rng: StdRng,
}

impl PacingEngine {
    /// Create an engine with fresh state
    pub fn new(config: EngineConfig) -> Self {
        Self::with_state(config, ControllerState::new(config.epsilon_init))
    }

    /// Create an engine that resumes from a previously saved state
    pub fn with_state(config: EngineConfig, state: ControllerState) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            policy: Box::new(EpsilonGreedy::new(config.learning_rate)),
            schedule: DecaySchedule::new(config.epsilon_min, config.epsilon_decay),
            state,
            rng,
        }
    }

    /// Pick the action for the next cycle.
    ///
    /// Actions still awaiting their cold-start trial come first, in id
    /// order. The queue entry is only consumed once the cycle is observed,
    /// so an abandoned cycle retries the same action.
    pub fn next_action(&mut self) -> Action {
        if let Some(action) = self.state.cold_start.front() {
            return *action;
        }
        self.policy
            .select(&self.state.values, self.state.epsilon, &mut self.rng)
    }

    /// Fold a completed cycle into the state and return its record
    pub fn observe(&mut self, action: Action, signal: RewardSignal) -> Experience {
        if self.state.cold_start.front() == Some(&action) {
            self.state.cold_start.pop_front();
        }

        self.state.cumulative_reward += signal.reward;
        self.policy
            .update(&mut self.state.values, action, signal.reward);

        let experience = Experience::new(
            self.state.step,
            action,
            signal,
            self.state.cumulative_reward,
            self.state.epsilon,
            self.state.values.clone(),
        );

        self.state.step += 1;
        self.state.epsilon = self.schedule.step(self.state.epsilon, self.state.step);

        debug!(
            "Step {} observed: action={}, reward={:.4}, epsilon now {:.4}",
            experience.step, action, signal.reward, self.state.epsilon
        );

        experience
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn epsilon(&self) -> f64 {
        self.state.epsilon
    }

    /// Best action for reporting; ties go to the lowest id
    pub fn best_action(&self) -> Action {
        self.state.values.best_action()
    }

    /// Get statistics
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_steps: self.state.step,
            total_rewards: self.state.cumulative_reward,
            average_reward: if self.state.step > 0 {
                self.state.cumulative_reward / self.state.step as f64
            } else {
                0.0
            },
            epsilon: self.state.epsilon,
            best_action: self.best_action(),
            policy: self.policy.name().to_string(),
        }
    }

    /// Get policy parameters
    pub fn get_policy_params(&self) -> serde_json::Value {
        self.policy.get_params()
    }

    /// Set policy parameters
    pub fn set_policy_params(&mut self, params: serde_json::Value) -> Result<()> {
        self.policy.set_params(params)
    }
}

impl Default for PacingEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Engine statistics
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub total_steps: u64,
    pub total_rewards: f64,
    pub average_reward: f64,
    pub epsilon: f64,
    pub best_action: Action,
    pub policy: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(reward: f64) -> RewardSignal {
        RewardSignal {
            reward,
            avg_throughput: 10f64.powf(reward),
            avg_rtt: 1.0,
        }
    }

    fn seeded() -> PacingEngine {
        PacingEngine::new(EngineConfig {
            seed: Some(42),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_engine_creation() {
        let engine = PacingEngine::default();
        assert_eq!(engine.epsilon(), 1.0);
        assert_eq!(engine.stats().total_steps, 0);
        assert_eq!(engine.stats().policy, "epsilon_greedy");
    }

    #[test]
    fn test_cold_start_order() {
        let mut engine = PacingEngine::new(EngineConfig {
            epsilon_init: 0.0,
            epsilon_min: 0.0,
            seed: Some(1),
            ..EngineConfig::default()
        });

        let mut chosen = Vec::new();
        for _ in 0..5 {
            let action = engine.next_action();
            chosen.push(action.to_index());
            engine.observe(action, signal(0.5));
        }

        assert_eq!(chosen, vec![0, 1, 2, 3, 4]);
        assert!(!engine.state().in_cold_start());
    }

    #[test]
    fn test_abandoned_cycle_retries_cold_start_action() {
        let mut engine = seeded();
        let first = engine.next_action();
        // No observe: the cycle was abandoned
        assert_eq!(engine.next_action(), first);
        assert_eq!(engine.stats().total_steps, 0);
    }

    #[test]
    fn test_epsilon_untouched_through_warmup() {
        let mut engine = seeded();
        for _ in 0..5 {
            let action = engine.next_action();
            engine.observe(action, signal(0.1));
            assert_eq!(engine.epsilon(), 1.0);
        }

        let action = engine.next_action();
        let exp = engine.observe(action, signal(0.1));
        assert_eq!(exp.epsilon, 1.0);
        assert!((engine.epsilon() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_observe_accumulates_and_updates() {
        let mut engine = seeded();

        let a0 = engine.next_action();
        let exp = engine.observe(a0, signal(1.0));
        assert_eq!(exp.step, 0);
        assert_eq!(exp.cumulative_reward, 1.0);
        assert!((exp.values.get(a0) - 0.7).abs() < 1e-12);
        assert_eq!(exp.best_action, a0);

        let a1 = engine.next_action();
        let exp = engine.observe(a1, signal(-0.5));
        assert_eq!(exp.step, 1);
        assert_eq!(exp.cumulative_reward, 0.5);
        assert_eq!(exp.best_action, a0);

        let stats = engine.stats();
        assert_eq!(stats.total_steps, 2);
        assert_eq!(stats.average_reward, 0.25);
    }

    #[test]
    fn test_exploits_after_convergence() {
        let mut engine = PacingEngine::new(EngineConfig {
            epsilon_init: 0.0,
            epsilon_min: 0.0,
            seed: Some(9),
            ..EngineConfig::default()
        });

        for _ in 0..5 {
            let action = engine.next_action();
            let reward = if action.to_index() == 3 { 1.0 } else { 0.1 };
            engine.observe(action, signal(reward));
        }

        for _ in 0..20 {
            assert_eq!(engine.next_action().to_index(), 3);
        }
    }

    #[test]
    fn test_resume_from_state() {
        let mut state = ControllerState::new(0.3);
        state.cold_start.clear();
        state.step = 40;
        state.values.set(Action::from_index(1).unwrap(), 2.0);

        let engine = PacingEngine::with_state(EngineConfig::default(), state);
        assert_eq!(engine.epsilon(), 0.3);
        assert_eq!(engine.best_action().to_index(), 1);
        assert_eq!(engine.stats().total_steps, 40);
    }

    #[test]
    fn test_set_policy_params() {
        let mut engine = PacingEngine::default();
        assert!(engine
            .set_policy_params(serde_json::json!({"learning_rate": 0.5}))
            .is_ok());
        assert_eq!(engine.get_policy_params()["learning_rate"], 0.5);
    }
}

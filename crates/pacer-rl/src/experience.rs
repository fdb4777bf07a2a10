//! Per-cycle experience records and their journal renderings

use serde::{Deserialize, Serialize};

use pacer_core::util::fmt_float;

use crate::reward::RewardSignal;
use crate::state::{Action, Reward, ValueTable};

/// Outcome of one completed decision cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Zero-based index of the cycle
    pub step: u64,
    pub action: Action,
    pub reward: Reward,
    pub cumulative_reward: Reward,
    /// Exploration rate the action was chosen under
    pub epsilon: f64,
    pub best_action: Action,
    pub avg_throughput: f64,
    pub avg_rtt: f64,
    /// Value table after the update
    pub values: ValueTable,
}

impl Experience {
    pub fn new(
        step: u64,
        action: Action,
        signal: RewardSignal,
        cumulative_reward: Reward,
        epsilon: f64,
        values: ValueTable,
    ) -> Self {
        Self {
            step,
            action,
            reward: signal.reward,
            cumulative_reward,
            epsilon,
            best_action: values.best_action(),
            avg_throughput: signal.avg_throughput,
            avg_rtt: signal.avg_rtt,
            values,
        }
    }

    /// Line for the reward/trace journal
    pub fn trace_line(&self) -> String {
        format!(
            "Timestep: {}, Reward: {}, Accumulate reward: {}, Action: {}, Epsilon: {}, Best Action: {}, Throughput: {}, RTT: {}",
            self.step,
            fmt_float(self.reward),
            fmt_float(self.cumulative_reward),
            self.action,
            fmt_float(self.epsilon),
            self.best_action,
            fmt_float(self.avg_throughput),
            fmt_float(self.avg_rtt),
        )
    }

    /// Line for the value-table snapshot journal
    pub fn snapshot_line(&self) -> String {
        format!(
            "Time steps: {}, Accumulate reward: {}, {}, Epsilon: {}, Best Action: {}",
            self.step,
            fmt_float(self.cumulative_reward),
            self.values,
            fmt_float(self.epsilon),
            self.best_action,
        )
    }
}

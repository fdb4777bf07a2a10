//! Common types and compiled-in defaults used throughout pacer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of phases in one pacing-gain cycle
pub const PROFILE_LEN: usize = 8;

/// Multiplier applied to the pacing rate in each phase of a cycle
pub type PacingProfile = [f64; PROFILE_LEN];

/// Pacing profiles indexed by action id.
///
/// The sender maps the id it reads from the action file onto this table, so
/// the values must stay identical to the ones compiled into the sender.
pub const ACTION_PROFILES: [PacingProfile; 5] = [
    [1.25, 0.75, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    [2.0, 0.5, 1.5, 0.5, 2.0, 0.5, 1.5, 0.5],
    [1.5, 0.5, 1.5, 0.5, 1.5, 0.5, 1.5, 0.5],
    [1.5, 0.75, 1.25, 1.25, 1.25, 1.25, 1.25, 1.25],
    [1.11, 0.9, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
];

/// Number of selectable actions
pub const ACTIONS_N: usize = ACTION_PROFILES.len();

/// Compiled-in defaults for the learning loop and its channels
pub mod defaults {
    pub const EPSILON_INIT: f64 = 1.0;
    pub const EPSILON_MIN: f64 = 0.1;
    pub const EPSILON_DECAY: f64 = 0.95;
    /// EMA learning rate (ALPHA)
    pub const LEARNING_RATE: f64 = 0.7;

    pub const MEASUREMENT_PATH: &str = "/tmp/input_throughput_rtt.csv";
    pub const ACTION_PATH: &str = "/tmp/pacing_gain.txt";
    pub const TRACE_LOG_PATH: &str = "/tmp/logReward.csv";
    pub const VALUE_TABLE_LOG_PATH: &str = "/tmp/Q_Table.csv";

    pub const WARMUP_DELAY_MS: u64 = 5_000;
    pub const SETTLE_INTERVAL_MS: u64 = 3_000;
    pub const FEEDBACK_POLL_MS: u64 = 1_000;
    pub const HANDLE_POLL_MS: u64 = 1;
}

/// Timestamped wrapper for any value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamped<T> {
    pub value: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T> Timestamped<T> {
    pub fn new(value: T) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, value: T) {
        self.value = value;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_are_positive() {
        for profile in &ACTION_PROFILES {
            assert!(profile.iter().all(|m| *m > 0.0));
        }
    }

    #[test]
    fn test_profile_table_shape() {
        assert_eq!(ACTIONS_N, 5);
        assert_eq!(ACTION_PROFILES[1], [2.0, 0.5, 1.5, 0.5, 2.0, 0.5, 1.5, 0.5]);
        assert_eq!(ACTION_PROFILES[4][0], 1.11);
    }

    #[test]
    fn test_default_epsilon_bounds() {
        assert!(defaults::EPSILON_MIN <= defaults::EPSILON_INIT);
        assert!(defaults::EPSILON_DECAY > 0.0 && defaults::EPSILON_DECAY < 1.0);
        assert!(defaults::LEARNING_RATE > 0.0 && defaults::LEARNING_RATE <= 1.0);
    }

    #[test]
    fn test_timestamped_update() {
        let mut stamped = Timestamped::new(1);
        let created = stamped.created_at;
        stamped.update(2);

        assert_eq!(stamped.value, 2);
        assert_eq!(stamped.created_at, created);
        assert!(stamped.updated_at >= created);
    }
}

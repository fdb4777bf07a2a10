//! pacer RL - epsilon-greedy learning core for pacing-profile selection
//!
//! This crate provides the stateless bandit that picks a pacing multiplier
//! profile, the reward function that scores throughput/RTT samples, and the
//! exploration decay schedule.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithm;
pub mod engine;
pub mod experience;
pub mod reward;
pub mod schedule;
pub mod state;

pub use algorithm::{BanditPolicy, EpsilonGreedy};
pub use engine::{EngineConfig, EngineStats, PacingEngine};
pub use experience::Experience;
pub use reward::{RewardSignal, Sample};
pub use schedule::DecaySchedule;
pub use state::{Action, ControllerState, Reward, ValueTable};

//! Configuration loading for the pacer daemon
//!
//! Every field defaults to the compiled-in constant, so running without a
//! config file or environment overrides reproduces the stock controller.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;

use pacer_core::{defaults, PacerError};
use pacer_rl::EngineConfig;

/// Configuration for the daemon
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub channels: ChannelsConfig,
    pub learning: LearningConfig,
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub log_level: String,
    /// Diagnostics log file; empty means stdout only
    pub log_file: String,
    /// Pause before the first cycle
    pub warmup_delay_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: String::new(),
            warmup_delay_ms: defaults::WARMUP_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub action_path: PathBuf,
    pub measurement_path: PathBuf,
    /// Pause after publishing before sampling starts
    pub settle_interval_ms: u64,
    pub feedback_poll_ms: u64,
    pub handle_poll_ms: u64,
    /// Abandon a cycle after waiting this long for samples; unset waits forever
    pub feedback_timeout_ms: Option<u64>,
}

impl ChannelsConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn feedback_poll(&self) -> Duration {
        Duration::from_millis(self.feedback_poll_ms)
    }

    pub fn handle_poll(&self) -> Duration {
        Duration::from_millis(self.handle_poll_ms)
    }

    pub fn feedback_timeout(&self) -> Option<Duration> {
        self.feedback_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            action_path: PathBuf::from(defaults::ACTION_PATH),
            measurement_path: PathBuf::from(defaults::MEASUREMENT_PATH),
            settle_interval_ms: defaults::SETTLE_INTERVAL_MS,
            feedback_poll_ms: defaults::FEEDBACK_POLL_MS,
            handle_poll_ms: defaults::HANDLE_POLL_MS,
            feedback_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// EMA weight of the newest reward
    pub learning_rate: f64,
    pub epsilon_init: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    pub seed: Option<u64>,
    /// Persist controller state here after every cycle; unset keeps it in memory
    pub state_file: Option<PathBuf>,
}

impl LearningConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            learning_rate: self.learning_rate,
            epsilon_init: self.epsilon_init,
            epsilon_min: self.epsilon_min,
            epsilon_decay: self.epsilon_decay,
            seed: self.seed,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: defaults::LEARNING_RATE,
            epsilon_init: defaults::EPSILON_INIT,
            epsilon_min: defaults::EPSILON_MIN,
            epsilon_decay: defaults::EPSILON_DECAY,
            seed: None,
            state_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub trace_path: PathBuf,
    pub value_table_path: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::from(defaults::TRACE_LOG_PATH),
            value_table_path: PathBuf::from(defaults::VALUE_TABLE_LOG_PATH),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file();

        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        // Add config file if it exists
        if let Some(path) = &config_path {
            tracing::info!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path.clone()).required(false));
        } else {
            tracing::info!("No config file found, using defaults");
        }

        // Add environment variables with PACER_ prefix
        builder = builder.add_source(
            Environment::with_prefix("PACER")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the learning loop cannot honour
    pub fn validate(&self) -> std::result::Result<(), PacerError> {
        let l = &self.learning;

        if !(l.learning_rate > 0.0 && l.learning_rate <= 1.0) {
            return Err(PacerError::Config(format!(
                "learning.learning_rate must be in (0, 1], got {}",
                l.learning_rate
            )));
        }
        if !(l.epsilon_decay > 0.0 && l.epsilon_decay < 1.0) {
            return Err(PacerError::Config(format!(
                "learning.epsilon_decay must be in (0, 1), got {}",
                l.epsilon_decay
            )));
        }
        for (name, value) in [("epsilon_init", l.epsilon_init), ("epsilon_min", l.epsilon_min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PacerError::Config(format!(
                    "learning.{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if l.epsilon_min > l.epsilon_init {
            return Err(PacerError::Config(format!(
                "learning.epsilon_min ({}) exceeds epsilon_init ({})",
                l.epsilon_min, l.epsilon_init
            )));
        }
        if self.channels.feedback_poll_ms == 0 || self.channels.handle_poll_ms == 0 {
            return Err(PacerError::Config(
                "channel poll intervals must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: PACER_CONFIG env, ./pacer.toml, ~/.config/pacer/pacer.toml
        if let Ok(path) = std::env::var("PACER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("pacer.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("pacer").join("pacer.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}

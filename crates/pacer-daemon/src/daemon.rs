//! Control loop: select, publish, await feedback, learn, journal

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use pacer_core::PacerError;
use pacer_rl::{Action, ControllerState, EngineStats, Experience, PacingEngine, RewardSignal};

use crate::channel::{ActionChannel, HandleGuard, HandleProbe, MeasurementChannel, ProcFdProbe};
use crate::clock::{Clock, TokioClock};
use crate::config::Config;
use crate::journal::Journal;
use crate::state_store::StateStore;

/// Main pacer daemon
pub struct PacerDaemon {
    config: Config,
    engine: RwLock<PacingEngine>,
    action: ActionChannel,
    measurements: MeasurementChannel,
    guard: HandleGuard,
    clock: Arc<dyn Clock>,
    journal: Journal,
    store: Option<StateStore>,
    /// Latched once shutdown is requested, so a late `run` still sees it
    shutdown: watch::Sender<bool>,
}

impl PacerDaemon {
    /// Create a daemon that scans `/proc` for open handles and sleeps on the tokio timer
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_parts(config, Arc::new(ProcFdProbe), Arc::new(TokioClock)).await
    }

    /// Create a daemon with an explicit handle checker and clock
    pub async fn with_parts(
        config: Config,
        probe: Arc<dyn HandleProbe>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let (shutdown_tx, _) = watch::channel(false);

        let engine_config = config.learning.engine_config();
        let store = config.learning.state_file.as_ref().map(StateStore::new);
        let state = match &store {
            Some(store) => {
                store
                    .load_or(ControllerState::new(engine_config.epsilon_init))
                    .await
            }
            None => ControllerState::new(engine_config.epsilon_init),
        };

        let guard = HandleGuard::new(probe, clock.clone(), config.channels.handle_poll());

        Ok(Self {
            engine: RwLock::new(PacingEngine::with_state(engine_config, state)),
            action: ActionChannel::new(&config.channels.action_path),
            measurements: MeasurementChannel::new(&config.channels.measurement_path),
            guard,
            clock,
            journal: Journal::new(&config.journal.trace_path, &config.journal.value_table_path),
            store,
            shutdown: shutdown_tx,
            config,
        })
    }

    /// Run decision cycles until shutdown
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow() {
            info!("Shutdown requested before the control loop started");
            return Ok(());
        }

        info!(
            "Publishing actions to {}, reading samples from {}",
            self.action.path().display(),
            self.measurements.path().display()
        );

        let warmup = Duration::from_millis(self.config.daemon.warmup_delay_ms);
        tokio::select! {
            () = self.clock.sleep(warmup) => {}
            _ = shutdown_rx.wait_for(|stopped| *stopped) => return Ok(()),
        }

        loop {
            // Only the wait is interruptible; a batch that arrived is always learned
            let outcome = tokio::select! {
                outcome = self.await_feedback() => outcome,
                _ = shutdown_rx.wait_for(|stopped| *stopped) => {
                    info!("Control loop stopping");
                    break;
                }
            };

            match outcome {
                Ok(Some((action, signal))) => {
                    self.commit(action, signal).await;
                }
                Ok(None) => {}
                Err(e) => error!("Decision cycle failed: {}", e),
            }
        }

        Ok(())
    }

    /// Run one decision cycle.
    ///
    /// Returns `Ok(None)` when the cycle was abandoned because the feedback
    /// wait timed out; nothing is learned or journaled in that case.
    pub async fn run_cycle(&self) -> Result<Option<Experience>> {
        match self.await_feedback().await? {
            Some((action, signal)) => Ok(Some(self.commit(action, signal).await)),
            None => Ok(None),
        }
    }

    /// Select and publish an action, then wait for the reward signal it earns
    async fn await_feedback(&self) -> Result<Option<(Action, RewardSignal)>> {
        let action = self.engine.write().await.next_action();
        debug!("Selected action {} {:?}", action, action.profile());

        if let Err(e) = self.measurements.clear(&self.guard).await {
            warn!("Could not clear stale samples: {}", e);
        }
        if let Err(e) = self.action.publish(action, &self.guard).await {
            error!("Failed to publish action {}: {}", action, e);
        }

        self.clock.sleep(self.config.channels.settle_interval()).await;

        match self
            .measurements
            .await_signal(
                self.clock.as_ref(),
                self.config.channels.feedback_poll(),
                self.config.channels.feedback_timeout(),
            )
            .await
        {
            Ok(signal) => Ok(Some((action, signal))),
            Err(PacerError::Timeout(msg)) => {
                warn!("Abandoning cycle for action {}: {}", action, msg);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Learn from the signal, journal the step, then persist the new state.
    ///
    /// The engine lock is held throughout so the journal and the snapshot
    /// always agree on the last completed step.
    async fn commit(&self, action: Action, signal: RewardSignal) -> Experience {
        let mut engine = self.engine.write().await;
        let experience = engine.observe(action, signal);

        info!(
            "Timestep:{}, reward: {:.4}, accumulate reward: {:.4}, action: {}, epsilon: {:.4}, best_action: {}",
            experience.step,
            experience.reward,
            experience.cumulative_reward,
            experience.action,
            experience.epsilon,
            experience.best_action
        );

        if let Err(e) = self.journal.record(&experience).await {
            error!("Failed to journal step {}: {}", experience.step, e);
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save(engine.state()).await {
                warn!("Failed to save state to {}: {}", store.path().display(), e);
            }
        }

        experience
    }

    /// Get current statistics
    pub async fn stats(&self) -> EngineStats {
        self.engine.read().await.stats()
    }

    /// Graceful shutdown.
    ///
    /// The control loop stops at its next wait; a cycle already being
    /// committed finishes and persists itself.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down daemon...");

        self.shutdown.send_replace(true);

        let stats = self.stats().await;
        info!(
            "Final state: {} steps, cumulative reward {:.4}, best action {}",
            stats.total_steps, stats.total_rewards, stats.best_action
        );

        info!("Daemon shutdown complete");
        Ok(())
    }
}

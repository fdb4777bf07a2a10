//! pacer daemon - online pacing-profile controller
//!
//! The daemon repeatedly picks a pacing multiplier profile for the sender,
//! publishes it through the action file, scores the throughput/RTT samples
//! that come back, and adapts its epsilon-greedy policy.

// Pedantic clippy allows - intentional design decisions for this crate:
// - doc_markdown: file names and RTT are not code items
// - cast_precision_loss: step counts converted for averaging stay small
// - module_name_repetitions: StateStore in state_store reads fine
// - manual_let_else: match with Ok/Some patterns is often clearer than let-else
// - map_unwrap_or: map().unwrap_or() pattern is idiomatic
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::map_unwrap_or)]

use std::sync::Arc;

use anyhow::Result;
use pacer_core::util::load_env_file;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod channel;
mod clock;
mod config;
mod daemon;
mod journal;
mod state_store;

use crate::config::Config;
use crate::daemon::PacerDaemon;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from pacer.env file first
    load_env_file();

    // Load configuration to get log settings
    let config = Config::load()?;

    // Initialize tracing with optional file logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pacerd={}", config.daemon.log_level).into());

    let file_logging_enabled = if !config.daemon.log_file.is_empty() {
        // Try to set up file logging
        let log_path = std::path::Path::new(&config.daemon.log_file);
        let log_dir = log_path.parent().unwrap_or(std::path::Path::new("."));
        let log_filename = log_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("pacerd.log");

        // Try to create log directory and test write permissions
        let can_write = (|| -> std::io::Result<()> {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }
            let test_path = log_dir.join(".write_test");
            std::fs::write(&test_path, "test")?;
            std::fs::remove_file(&test_path)?;
            Ok(())
        })();

        match can_write {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Log to both file and stdout
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(non_blocking),
                    )
                    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
                    .init();

                // Keep guard alive for entire program - leak it intentionally
                Box::leak(Box::new(guard));
                true
            }
            Err(e) => {
                // Fall back to stdout-only logging
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
                eprintln!(
                    "Warning: Could not set up file logging to '{}': {}. Using stdout only.",
                    config.daemon.log_file, e
                );
                false
            }
        }
    } else {
        // Stdout only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        false
    };

    info!("Starting pacer daemon v{}", env!("CARGO_PKG_VERSION"));
    if file_logging_enabled {
        info!("Logging to file: {}", config.daemon.log_file);
    } else if !config.daemon.log_file.is_empty() {
        warn!("File logging was configured but could not be enabled");
    }
    info!(
        "Learning: alpha={}, epsilon={} -> {} (decay {})",
        config.learning.learning_rate,
        config.learning.epsilon_init,
        config.learning.epsilon_min,
        config.learning.epsilon_decay
    );
    match &config.learning.state_file {
        Some(path) => info!("Persisting controller state to {:?}", path),
        None => info!("Controller state is kept in memory only"),
    }
    if let Some(ms) = config.channels.feedback_timeout_ms {
        info!("Feedback wait is bounded to {} ms", ms);
    }

    // Create and start daemon
    let daemon = Arc::new(PacerDaemon::new(config).await?);

    // Clone for signal handler
    let daemon_handle = daemon.clone();

    // Spawn the control loop
    let daemon_task = tokio::spawn(async move {
        if let Err(e) = daemon.run().await {
            error!("Daemon error: {}", e);
        }
    });

    // Wait for shutdown signal (SIGINT or SIGTERM)
    shutdown_signal().await;

    // Graceful shutdown
    info!("Initiating graceful shutdown...");
    daemon_handle.shutdown().await?;

    // Wait for the loop to notice
    let _ = daemon_task.await;

    info!("pacer daemon stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}. Using fallback.", e);
                // Fallback: wait indefinitely (will be woken by terminate signal or process kill)
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}. Using Ctrl+C only.", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            info!("Received SIGTERM");
        }
    }
}

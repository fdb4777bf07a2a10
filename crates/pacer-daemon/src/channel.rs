//! File channels shared with the controlled sender
//!
//! The action channel is a file holding a single action id; the measurement
//! channel is a file of `throughput,rtt` lines written by an external
//! producer. Neither side locks anything: before removing a channel file we
//! poll until no process holds it open. That check is best effort and a
//! reader can still open the file right after it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use pacer_core::{PacerError, Result};
use pacer_rl::reward::{self, RewardSignal, Sample};
use pacer_rl::Action;

use crate::clock::Clock;

/// Answers whether any process currently holds a file open
pub trait HandleProbe: Send + Sync {
    fn is_held(&self, path: &Path) -> bool;
}

/// Scans `/proc/<pid>/fd` for descriptors pointing at the path.
///
/// Processes whose descriptor table cannot be read are skipped, so files held
/// only by other users' processes may be reported as free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcFdProbe;

impl HandleProbe for ProcFdProbe {
    fn is_held(&self, path: &Path) -> bool {
        let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        let Ok(procs) = std::fs::read_dir("/proc") else {
            return false;
        };

        for entry in procs.flatten() {
            let is_pid = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()));
            if !is_pid {
                continue;
            }

            let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
                continue;
            };
            for fd in fds.flatten() {
                if std::fs::read_link(fd.path()).is_ok_and(|link| link == target) {
                    return true;
                }
            }
        }

        false
    }
}

/// Waits out external readers before a channel file is removed
#[derive(Clone)]
pub struct HandleGuard {
    probe: Arc<dyn HandleProbe>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl HandleGuard {
    pub fn new(probe: Arc<dyn HandleProbe>, clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        Self {
            probe,
            clock,
            poll_interval,
        }
    }

    /// Poll until no process holds `path` open
    pub async fn wait_released(&self, path: &Path) -> Result<()> {
        loop {
            let probe = self.probe.clone();
            let owned = path.to_path_buf();
            let held = tokio::task::spawn_blocking(move || probe.is_held(&owned))
                .await
                .map_err(|e| PacerError::Channel(format!("handle check failed: {e}")))?;
            if !held {
                return Ok(());
            }
            trace!("{} still held open, waiting", path.display());
            self.clock.sleep(self.poll_interval).await;
        }
    }

    /// Remove `path` once released; a missing file is not an error
    pub async fn release_and_remove(&self, path: &Path) -> Result<()> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }

        self.wait_released(path).await?;

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed stale {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PacerError::Channel(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

/// File the sender reads its pacing profile id from
#[derive(Debug, Clone)]
pub struct ActionChannel {
    path: PathBuf,
}

impl ActionChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the channel contents with `action`'s id
    pub async fn publish(&self, action: Action, guard: &HandleGuard) -> Result<()> {
        guard.release_and_remove(&self.path).await?;

        tokio::fs::write(&self.path, action.to_string())
            .await
            .map_err(|e| {
                PacerError::Channel(format!("failed to write {}: {e}", self.path.display()))
            })
    }
}

/// File the measurement producer appends samples to
#[derive(Debug, Clone)]
pub struct MeasurementChannel {
    path: PathBuf,
}

impl MeasurementChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop samples left over from the previous cycle
    pub async fn clear(&self, guard: &HandleGuard) -> Result<()> {
        guard.release_and_remove(&self.path).await
    }

    /// Well-formed samples currently in the file, `None` if it is missing or
    /// unreadable
    pub async fn read_batch(&self) -> Option<Vec<Sample>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Some(reward::parse_batch(&contents)),
            Err(e) => {
                trace!("Measurement file not readable yet: {}", e);
                None
            }
        }
    }

    /// Poll until the file yields a usable reward.
    ///
    /// With `timeout` unset the wait is unbounded. Waiting time is the sum of
    /// requested sleeps, so it follows the injected clock.
    pub async fn await_signal(
        &self,
        clock: &dyn Clock,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<RewardSignal> {
        let mut waited = Duration::ZERO;

        loop {
            if let Some(signal) = self.read_batch().await.and_then(|b| reward::compute(&b)) {
                return Ok(signal);
            }

            if let Some(limit) = timeout {
                if waited >= limit {
                    return Err(PacerError::Timeout(format!(
                        "no usable samples in {} after {:?}",
                        self.path.display(),
                        waited
                    )));
                }
            }

            clock.sleep(poll_interval).await;
            waited += poll_interval;
        }
    }
}

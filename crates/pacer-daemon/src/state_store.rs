//! Optional on-disk snapshot of the controller state
//!
//! Off by default: without a configured state file every restart begins from
//! a fresh value table and the initial exploration rate.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{info, warn};

use pacer_core::{PacerError, Result, Timestamped};
use pacer_rl::ControllerState;

/// JSON snapshot of [`ControllerState`] at a fixed path
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    /// Last snapshot loaded or written; its `created_at` survives every save
    current: Mutex<Option<Timestamped<ControllerState>>>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot; `Ok(None)` if none has been written yet
    pub async fn load(&self) -> Result<Option<Timestamped<ControllerState>>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: Timestamped<ControllerState> = serde_json::from_str(&contents)
            .map_err(|e| PacerError::State(format!("{}: {e}", self.path.display())))?;
        Ok(Some(snapshot))
    }

    /// Load the last snapshot, falling back to `fresh` when there is none or
    /// it cannot be used
    pub async fn load_or(&self, fresh: ControllerState) -> ControllerState {
        match self.load().await {
            Ok(Some(snapshot)) => {
                info!(
                    "Resuming from {} (step {}, saved {})",
                    self.path.display(),
                    snapshot.value.step,
                    snapshot.updated_at
                );
                let state = snapshot.value.clone();
                *self.current.lock().await = Some(snapshot);
                state
            }
            Ok(None) => fresh,
            Err(e) => {
                warn!("Ignoring unusable state snapshot: {}", e);
                fresh
            }
        }
    }

    /// Write the snapshot through a temp file and rename it into place.
    ///
    /// Saves are serialized, so concurrent callers never share the temp file.
    pub async fn save(&self, state: &ControllerState) -> Result<()> {
        let mut current = self.current.lock().await;
        let snapshot = match current.take() {
            Some(mut snapshot) => {
                snapshot.update(state.clone());
                snapshot
            }
            None => Timestamped::new(state.clone()),
        };
        let json = serde_json::to_vec_pretty(&snapshot);
        *current = Some(snapshot);
        let json = json?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_rl::Action;

    #[tokio::test]
    async fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.load_or(ControllerState::new(1.0)).await, ControllerState::new(1.0));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = ControllerState::new(0.4);
        state.step = 12;
        state.cumulative_reward = 3.5;
        state.cold_start.clear();
        state.values.set(Action::from_index(4).unwrap(), 0.9);

        store.save(&state).await.unwrap();
        assert!(!dir.path().join("state.tmp").exists());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.value, state);
    }

    #[tokio::test]
    async fn test_creation_time_survives_saves_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::new(&path);
        let mut state = ControllerState::new(1.0);
        store.save(&state).await.unwrap();
        let first = store.load().await.unwrap().unwrap();

        state.step = 1;
        store.save(&state).await.unwrap();
        let second = store.load().await.unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.value.step, 1);

        // A restarted store picks up the original creation time
        let restarted = StateStore::new(&path);
        let resumed = restarted.load_or(ControllerState::new(1.0)).await;
        assert_eq!(resumed.step, 1);
        state.step = 2;
        restarted.save(&state).await.unwrap();
        let third = restarted.load().await.unwrap().unwrap();
        assert_eq!(third.created_at, first.created_at);
        assert_eq!(third.value.step, 2);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = StateStore::new(&path);
        assert!(matches!(store.load().await, Err(PacerError::State(_))));
        assert_eq!(store.load_or(ControllerState::new(1.0)).await.step, 0);
    }
}

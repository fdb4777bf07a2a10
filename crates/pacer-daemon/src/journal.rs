//! Append-only reward and value-table journals

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use pacer_core::{PacerError, Result};
use pacer_rl::Experience;

/// The two per-step journals: reward trace and value-table snapshots
#[derive(Debug, Clone)]
pub struct Journal {
    trace_path: PathBuf,
    values_path: PathBuf,
}

impl Journal {
    pub fn new(trace_path: impl Into<PathBuf>, values_path: impl Into<PathBuf>) -> Self {
        Self {
            trace_path: trace_path.into(),
            values_path: values_path.into(),
        }
    }

    /// Append one line to each journal
    pub async fn record(&self, experience: &Experience) -> Result<()> {
        append_line(&self.trace_path, &experience.trace_line()).await?;
        append_line(&self.values_path, &experience.snapshot_line()).await
    }
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| PacerError::Journal(format!("failed to open {}: {e}", path.display())))?;

    file.write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(|e| PacerError::Journal(format!("failed to append to {}: {e}", path.display())))?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_rl::{Action, RewardSignal, ValueTable};

    fn experience(step: u64) -> Experience {
        Experience::new(
            step,
            Action::from_index(0).unwrap(),
            RewardSignal {
                reward: 0.5,
                avg_throughput: 50.0,
                avg_rtt: 10.0,
            },
            0.5 * (step + 1) as f64,
            1.0,
            ValueTable::new(),
        )
    }

    #[tokio::test]
    async fn test_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("logReward.csv");
        let values = dir.path().join("Q_Table.csv");
        std::fs::write(&trace, "existing\n").unwrap();

        let journal = Journal::new(&trace, &values);
        journal.record(&experience(0)).await.unwrap();
        journal.record(&experience(1)).await.unwrap();

        let trace_lines: Vec<String> = std::fs::read_to_string(&trace)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(trace_lines.len(), 3);
        assert_eq!(trace_lines[0], "existing");
        assert!(trace_lines[1].starts_with("Timestep: 0, Reward: 0.5,"));
        assert!(trace_lines[2].starts_with("Timestep: 1, Reward: 0.5, Accumulate reward: 1.0,"));

        let value_lines = std::fs::read_to_string(&values).unwrap();
        assert_eq!(value_lines.lines().count(), 2);
        assert!(value_lines.starts_with("Time steps: 0, Accumulate reward: 0.5, {0: 0.0,"));
    }

    #[tokio::test]
    async fn test_record_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("nope/a.csv"), dir.path().join("nope/b.csv"));

        let err = journal.record(&experience(0)).await.unwrap_err();
        assert!(matches!(err, PacerError::Journal(_)));
    }
}

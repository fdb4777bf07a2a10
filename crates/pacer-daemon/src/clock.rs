//! Sleep abstraction for the polling loop
//!
//! Every wait in the control loop goes through a [`Clock`] so tests can run
//! whole cycles without real delays.

use std::time::Duration;

use async_trait::async_trait;

/// Source of suspensions for polling waits
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_sleeps() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_manual_clock_records_and_hooks() {
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_hook = seen.clone();
        let clock = ManualClock::with_hook(move |i| {
            seen_hook.store(i + 1, std::sync::atomic::Ordering::SeqCst);
        });

        clock.sleep(Duration::from_millis(5)).await;
        clock.sleep(Duration::from_millis(7)).await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(5), Duration::from_millis(7)]
        );
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}

//! Process-wide spacing of upstream request attempts.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum interval between request attempt starts.
///
/// Shared across all concurrent fetches so that retries and chunked
/// requests together never exceed the upstream's tolerated rate. The
/// lock is held across the sleep on purpose: a waiter must not start
/// its attempt until the holder's slot has elapsed.
pub struct RateGovernor {
    min_interval: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl RateGovernor {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_attempt: Mutex::new(None),
        }
    }

    /// Waits until the next attempt slot is open, then claims it.
    pub async fn wait_and_mark(&self) {
        let mut last = self.last_attempt.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spaces_consecutive_attempts() {
        let governor = RateGovernor::new(Duration::from_millis(50));
        let start = Instant::now();
        governor.wait_and_mark().await;
        governor.wait_and_mark().await;
        governor.wait_and_mark().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn first_attempt_is_immediate() {
        let governor = RateGovernor::new(Duration::from_secs(5));
        let start = Instant::now();
        governor.wait_and_mark().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}

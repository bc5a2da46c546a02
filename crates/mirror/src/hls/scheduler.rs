// Poll scheduling: decides when the next playlist refresh starts.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Called once after every completed cycle.
#[async_trait]
pub trait PollSchedule: Send {
    /// Wait until the next cycle should start. Returns `false` to stop polling.
    async fn wait_next(&mut self) -> bool;
}

/// Repeat forever with a fixed delay between cycles.
///
/// Optionally stops after a number of cycles or when a cancellation token fires.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    interval: Duration,
    max_cycles: Option<u64>,
    completed: u64,
    cancel: Option<CancellationToken>,
}

impl FixedDelay {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
            completed: 0,
            cancel: None,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl PollSchedule for FixedDelay {
    async fn wait_next(&mut self) -> bool {
        self.completed += 1;
        if self.max_cycles.is_some_and(|max| self.completed >= max) {
            info!(cycles = self.completed, "Reached cycle limit");
            return false;
        }

        info!("Sleeping {}s before next refresh", self.interval.as_secs_f64());
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        info!("Shutdown requested, stopping poll loop");
                        false
                    }
                    _ = tokio::time::sleep(self.interval) => true,
                }
            }
            None => {
                tokio::time::sleep(self.interval).await;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stops_after_max_cycles() {
        let mut schedule = FixedDelay::new(Duration::ZERO).with_max_cycles(3);
        assert!(schedule.wait_next().await);
        assert!(schedule.wait_next().await);
        assert!(!schedule.wait_next().await);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep() {
        let token = CancellationToken::new();
        let mut schedule = FixedDelay::new(Duration::from_secs(3600)).with_cancellation(token.clone());
        token.cancel();
        assert!(!schedule.wait_next().await);
    }

    #[tokio::test]
    async fn test_unbounded_keeps_going() {
        let mut schedule = FixedDelay::new(Duration::from_millis(1));
        for _ in 0..5 {
            assert!(schedule.wait_next().await);
        }
        assert_eq!(schedule.interval(), Duration::from_millis(1));
    }
}

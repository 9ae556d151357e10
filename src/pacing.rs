//! Minimum spacing between outbound calls.
//!
//! Telegram and the Sheets API both throttle bursts, so the job waits a fixed
//! interval between consecutive sends and between consecutive deletions.

use std::time::Duration;

/// Default pause between two messages.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(1500);
/// Default pause between two row deletions.
pub const DEFAULT_DELETE_INTERVAL: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub send_interval: Duration,
    pub delete_interval: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            send_interval: DEFAULT_SEND_INTERVAL,
            delete_interval: DEFAULT_DELETE_INTERVAL,
        }
    }
}

impl PacingPolicy {
    pub fn from_millis(send_ms: u64, delete_ms: u64) -> Self {
        Self {
            send_interval: Duration::from_millis(send_ms),
            delete_interval: Duration::from_millis(delete_ms),
        }
    }

    /// No waiting at all. Used by tests and dry runs.
    pub fn none() -> Self {
        Self {
            send_interval: Duration::ZERO,
            delete_interval: Duration::ZERO,
        }
    }

    pub async fn between_sends(&self) {
        pause(self.send_interval).await;
    }

    pub async fn between_deletes(&self) {
        pause(self.delete_interval).await;
    }
}

async fn pause(interval: Duration) {
    if !interval.is_zero() {
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn defaults_match_rate_limits() {
        let policy = PacingPolicy::default();
        assert_eq!(policy.send_interval, Duration::from_millis(1500));
        assert_eq!(policy.delete_interval, Duration::from_millis(1200));
        assert_eq!(PacingPolicy::from_millis(1500, 1200), policy);
    }

    #[tokio::test]
    async fn waits_for_the_configured_interval() {
        let policy = PacingPolicy::from_millis(30, 20);
        let start = Instant::now();
        policy.between_sends().await;
        assert!(start.elapsed() >= Duration::from_millis(30));

        let start = Instant::now();
        policy.between_deletes().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn zero_policy_returns_immediately() {
        let start = std::time::Instant::now();
        PacingPolicy::none().between_sends().await;
        PacingPolicy::none().between_deletes().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}

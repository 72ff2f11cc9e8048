//! Open-instant scheduling
//!
//! [`OpenWaiter`] suspends the caller until a reservation window opens. One
//! coarse sleep brings it to `early_margin` before the open instant, then a
//! micro-poll loop in `poll_increment` steps bounds the overshoot to about
//! one increment regardless of how late the coarse sleep wakes up.
//!
//! Wall-clock time (`Utc::now`) is the reference: the open instant is
//! published by the backend as a wall-clock timestamp.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::Config;

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// No open instant is known
    Unscheduled,
    /// The open instant had already passed
    AlreadyOpen,
    /// Waited until the open instant; `overshoot` is how late it returned
    Opened { overshoot: Duration },
}

/// Waits for open instants with bounded precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenWaiter {
    early_margin: Duration,
    poll_increment: Duration,
}

impl Default for OpenWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_millis(10))
    }
}

impl OpenWaiter {
    /// Create a waiter; a zero poll increment is raised to 1 ms
    pub fn new(early_margin: Duration, poll_increment: Duration) -> Self {
        Self {
            early_margin,
            poll_increment: poll_increment.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.burst.arrive_early_ms),
            Duration::from_millis(config.burst.micro_poll_ms),
        )
    }

    pub fn poll_increment(&self) -> Duration {
        self.poll_increment
    }

    /// Sleep until `open_at`
    ///
    /// Returns immediately when `open_at` is `None` or not in the future.
    pub async fn wait_until_open(&self, open_at: Option<DateTime<Utc>>) -> WaitOutcome {
        let Some(open_at) = open_at else {
            return WaitOutcome::Unscheduled;
        };

        let Some(remaining) = remaining_until(open_at) else {
            return WaitOutcome::AlreadyOpen;
        };

        tracing::info!(
            open_at = %open_at,
            wait_ms = remaining.as_millis() as u64,
            "Waiting for reservation to open"
        );

        if let Some(coarse) = remaining.checked_sub(self.early_margin) {
            tokio::time::sleep(coarse).await;
        }

        while let Some(left) = remaining_until(open_at) {
            tokio::time::sleep(left.min(self.poll_increment)).await;
        }

        let overshoot = (Utc::now() - open_at).to_std().unwrap_or_default();
        tracing::debug!(overshoot_ms = overshoot.as_millis() as u64, "Open instant reached");
        WaitOutcome::Opened { overshoot }
    }
}

/// Time left until `at`, `None` once it has passed
fn remaining_until(at: DateTime<Utc>) -> Option<Duration> {
    (at - Utc::now()).to_std().ok().filter(|d| !d.is_zero())
}

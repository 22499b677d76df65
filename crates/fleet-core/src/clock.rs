//! Injected time source.
//!
//! The reconciliation loops are wall-clock bounded and sleep between
//! ticks. Both operations go through this trait so tests drive time
//! deterministically instead of waiting on real timers.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// A monotonic time source plus a sleep primitive.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time elapsed since the clock's own epoch.
    fn now(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Real time: monotonic from process-local anchor, `tokio::time::sleep`.
#[derive(Debug)]
pub struct SystemClock {
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.anchor.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// src/sync/debounce.rs
// DOCUMENTATION: Trailing-edge debounce deadline
// PURPOSE: Coalesce bursts of map-settle events into one, owned by the controller task

use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debouncer
/// DOCUMENTATION: Each `trigger` restarts the quiet window from now; only
/// the last trigger of a burst fires. Polled from a `select!` loop via
/// `wait_until`, which never resolves while nothing is pending.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn trigger(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Arm once; later calls keep the first deadline
    pub fn arm_once(&mut self) {
        if self.deadline.is_none() {
            self.trigger();
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Deadline to wait on, copied out so the caller can keep `&mut self` free
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Mark the pending deadline as consumed
    pub fn fire(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

/// Sleep until `deadline`, or forever when there is none
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_trigger_resets_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let start = Instant::now();

        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.trigger();

        wait_until(debouncer.deadline()).await;
        assert!(debouncer.fire());
        assert_eq!(Instant::now() - start, Duration::from_millis(800));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_once_keeps_first_deadline() {
        let mut timer = Debouncer::new(Duration::from_secs(5));
        timer.arm_once();
        let first = timer.deadline();

        tokio::time::sleep(Duration::from_secs(1)).await;
        timer.arm_once();
        assert_eq!(timer.deadline(), first);

        timer.cancel();
        assert!(!timer.fire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_deadline_never_fires() {
        let fired = tokio::time::timeout(Duration::from_secs(3600), wait_until(None)).await;
        assert!(fired.is_err());
    }
}

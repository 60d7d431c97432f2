//! Spawned task ownership
//!
//! Every background task the shell starts for the core is held by a
//! [`TaskGuard`], so dropping the owner stops the task.

use std::collections::HashMap;
use std::time::Duration;

use sl_reveal::{RevealEvent, TimerRequest, TimerToken};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::driver::DriverEvent;

/// Convert a millisecond duration from the core into a `Duration`
pub fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

/// Aborts the task when dropped
#[derive(Debug)]
pub struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Timers armed by the core, keyed by token
#[derive(Debug, Default)]
pub struct TimerSet {
    armed: HashMap<TimerToken, TaskGuard>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a sleep that reports `TimerFired` into the queue
    pub fn arm(&mut self, request: TimerRequest, events: mpsc::Sender<DriverEvent>) {
        let token = request.token;
        let delay = millis(request.duration_ms);
        let guard = TaskGuard::spawn(async move {
            tokio::time::sleep(delay).await;
            if events
                .send(DriverEvent::Reveal(RevealEvent::TimerFired(token)))
                .await
                .is_err()
            {
                log::debug!("[Timer] Queue closed before {:?} fired", token);
            }
        });
        self.armed.insert(token, guard);
    }

    /// Abort a timer. Returns false if it was unknown.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        self.armed.remove(&token).is_some()
    }

    /// Drop bookkeeping for a timer that has fired
    pub fn forget(&mut self, token: TimerToken) {
        self.armed.remove(&token);
    }

    pub fn abort_all(&mut self) {
        self.armed.clear();
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_reveal::{ScopedTimer, TimerKind};

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_into_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = TimerSet::new();
        let (_, request) = ScopedTimer::new().arm(TimerKind::WinnerEmphasis, 500.0);
        timers.arm(request, tx);

        match rx.recv().await {
            Some(DriverEvent::Reveal(RevealEvent::TimerFired(token))) => assert_eq!(token, request.token),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = TimerSet::new();
        let (_, request) = ScopedTimer::new().arm(TimerKind::WinnerEmphasis, 500.0);
        timers.arm(request, tx);
        assert!(timers.cancel(request.token));
        assert!(timers.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_millis() {
        assert_eq!(millis(1500.0), Duration::from_millis(1500));
        assert_eq!(millis(-3.0), Duration::ZERO);
        assert_eq!(millis(f64::NAN), Duration::ZERO);
    }
}

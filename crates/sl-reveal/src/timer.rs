//! Scoped timers
//!
//! The core never sleeps. It arms a timer by emitting a [`TimerRequest`] and
//! later receives the token back when the shell's timer fires. A token is only
//! honoured if it is still the armed one; anything else is stale.

use serde::{Deserialize, Serialize};

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Landed-winner highlight
    WinnerEmphasis,
}

/// Handle identifying one arming of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Request to the shell to fire `token` after `duration_ms`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerRequest {
    pub token: TimerToken,
    pub duration_ms: f64,
}

/// Single timer slot with generation tagging
#[derive(Debug, Default)]
pub struct ScopedTimer {
    armed: Option<TimerToken>,
    generation: u64,
}

impl ScopedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot. Returns the token previously armed, which the caller
    /// must cancel, along with the new request.
    pub fn arm(&mut self, kind: TimerKind, duration_ms: f64) -> (Option<TimerToken>, TimerRequest) {
        let previous = self.armed.take();
        self.generation += 1;
        let token = TimerToken {
            kind,
            generation: self.generation,
        };
        self.armed = Some(token);
        (
            previous,
            TimerRequest {
                token,
                duration_ms: duration_ms.max(0.0),
            },
        )
    }

    /// Disarm, returning the token that was armed
    pub fn cancel(&mut self) -> Option<TimerToken> {
        self.armed.take()
    }

    /// Consume a firing. False for stale tokens.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.armed == Some(token) {
            self.armed = None;
            true
        } else {
            false
        }
    }

    pub fn armed(&self) -> Option<TimerToken> {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_fire() {
        let mut timer = ScopedTimer::new();
        let (previous, request) = timer.arm(TimerKind::WinnerEmphasis, 1800.0);
        assert!(previous.is_none());
        assert!(timer.fire(request.token));
        assert!(timer.armed().is_none());
        // Second firing of the same token is stale
        assert!(!timer.fire(request.token));
    }

    #[test]
    fn test_rearm_invalidates_old_token() {
        let mut timer = ScopedTimer::new();
        let (_, first) = timer.arm(TimerKind::WinnerEmphasis, 100.0);
        let (previous, second) = timer.arm(TimerKind::WinnerEmphasis, 100.0);
        assert_eq!(previous, Some(first.token));
        assert!(!timer.fire(first.token));
        assert!(timer.fire(second.token));
    }

    #[test]
    fn test_cancel() {
        let mut timer = ScopedTimer::new();
        let (_, request) = timer.arm(TimerKind::WinnerEmphasis, 100.0);
        assert_eq!(timer.cancel(), Some(request.token));
        assert_eq!(timer.cancel(), None);
        assert!(!timer.fire(request.token));
    }
}

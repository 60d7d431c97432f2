//! Effects the shell executes on behalf of the core

use serde::{Deserialize, Serialize};

use crate::stage::AnimationCommand;
use crate::timer::{TimerRequest, TimerToken};

/// Side effect requested by the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ShellEffect {
    /// Run one reel transit, then report `PhaseComplete`
    Animate(AnimationCommand),
    /// Start a timer that reports `TimerFired`
    ArmTimer(TimerRequest),
    /// Abort a previously armed timer
    CancelTimer(TimerToken),
    /// Send `checkPayment` every `interval_ms` until stopped
    StartPaymentPoll { invoice_id: String, interval_ms: f64 },
    StopPaymentPoll,
    /// Ask the authority for a fresh `walletBalance`
    RequestBalance,
    /// Visible state moved to `revision`
    VisibleChanged { revision: u64 },
}

impl ShellEffect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Animate(_) => "animate",
            Self::ArmTimer(_) => "arm_timer",
            Self::CancelTimer(_) => "cancel_timer",
            Self::StartPaymentPoll { .. } => "start_payment_poll",
            Self::StopPaymentPoll => "stop_payment_poll",
            Self::RequestBalance => "request_balance",
            Self::VisibleChanged { .. } => "visible_changed",
        }
    }
}

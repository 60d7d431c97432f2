//! Visible state - everything the player can observe
//!
//! The controller is the only writer. Every observable change bumps
//! `revision` exactly once, so a flush of several deferred fields shows up as
//! a single update.

use serde::{Deserialize, Serialize};
use sl_protocol::SpinOutcome;

use crate::pending::PayoutResult;
use crate::rarity::RarityTier;
use crate::reel::{IdlePreview, ReelSequence};
use crate::stage::AnimationState;

/// Status line texts
pub mod status {
    pub const DISCONNECTED: &str = "Disconnected from server";
    pub const PAYMENT_VERIFIED: &str = "Payment verified. Spinning...";
    pub const SPINNING: &str = "Spinning...";
    pub const PAYMENT_FAILED: &str = "Payment failed. Please try again.";
    pub const INVOICE_EXPIRED: &str = "Invoice expired. Please start again.";
    pub const GENERIC_ERROR: &str = "Error";
    pub const NO_PAYOUT: &str = "No payout this spin (0 SATS)";

    pub fn pay_to_spin(amount_sats: u64) -> String {
        format!("Pay {} SATS to spin", amount_sats)
    }

    pub fn result(payout_amount: u64) -> String {
        format!("Result: {} SATS", payout_amount)
    }
}

/// Player-facing text for a payout result
pub fn payout_status_text(result: &PayoutResult) -> String {
    match result {
        PayoutResult::Sent(sent) if sent.payout_amount == 0 => status::NO_PAYOUT.to_string(),
        PayoutResult::Sent(sent) if sent.credited_to_wallet => {
            format!("Credited {} SATS to your wallet", sent.payout_amount)
        }
        PayoutResult::Sent(sent) => {
            format!("Paid {} SATS to {}", sent.payout_amount, sent.recipient)
        }
        PayoutResult::Failed(failed) => format!("Payout failed: {}", failed.error),
    }
}

/// What the reel strip currently shows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "strip", rename_all = "snake_case")]
pub enum ReelView {
    #[default]
    Empty,
    Preview(IdlePreview),
    Sequence(ReelSequence),
}

impl ReelView {
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Preview(preview) => preview.entries.len(),
            Self::Sequence(sequence) => sequence.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Invoice modal contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPrompt {
    pub invoice_id: String,
    pub amount_sats: u64,
    pub payment_url: Option<String>,
}

/// Highlight on the landed winner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinnerEmphasis {
    pub index: usize,
    pub value: u64,
    pub tier: RarityTier,
    pub intensity: f64,
}

/// Snapshot of the player's view
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisibleState {
    pub revision: u64,
    pub connected: bool,
    pub status: String,
    pub bet_options: Vec<u64>,
    pub selected_bet: Option<u64>,
    pub balance_sats: Option<u64>,
    pub last_outcome: Option<SpinOutcome>,
    pub payout_status: Option<PayoutResult>,
    pub payment_prompt: Option<PaymentPrompt>,
    pub reel: ReelView,
    pub animation: AnimationState,
    pub emphasis: Option<WinnerEmphasis>,
}

impl VisibleState {
    pub fn payout_text(&self) -> Option<String> {
        self.payout_status.as_ref().map(payout_status_text)
    }

    /// One-line summary for logs and the console
    pub fn summary(&self) -> String {
        let balance = self
            .balance_sats
            .map(|b| b.to_string())
            .unwrap_or_else(|| "?".to_string());
        let outcome = self
            .last_outcome
            .as_ref()
            .map(|o| format!("{}→{}", o.bet_amount, o.payout_amount))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "r{} [{}] stage={} balance={} outcome={} status=\"{}\"",
            self.revision,
            if self.connected { "online" } else { "offline" },
            self.animation.stage,
            balance,
            outcome,
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_protocol::{PayoutFailed, PayoutSent};

    #[test]
    fn test_payout_texts() {
        let sent = |amount, credited| {
            PayoutResult::Sent(PayoutSent {
                payout_amount: amount,
                recipient: "bob@speed.app".into(),
                credited_to_wallet: credited,
                balance_sats: None,
            })
        };
        assert_eq!(payout_status_text(&sent(80, false)), "Paid 80 SATS to bob@speed.app");
        assert_eq!(payout_status_text(&sent(0, false)), status::NO_PAYOUT);
        assert_eq!(payout_status_text(&sent(80, true)), "Credited 80 SATS to your wallet");

        let failed = PayoutResult::Failed(PayoutFailed {
            payout_amount: 80,
            recipient: "bob@speed.app".into(),
            error: "route not found".into(),
        });
        assert_eq!(payout_status_text(&failed), "Payout failed: route not found");
    }

    #[test]
    fn test_summary() {
        let state = VisibleState {
            revision: 3,
            connected: true,
            balance_sats: Some(120),
            status: status::result(50),
            ..Default::default()
        };
        assert_eq!(
            state.summary(),
            "r3 [online] stage=idle balance=120 outcome=- status=\"Result: 50 SATS\""
        );
    }
}

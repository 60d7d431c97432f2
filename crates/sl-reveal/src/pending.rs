//! PendingUpdateQueue - authority messages held back during a reveal
//!
//! Each field of [`PendingReveal`] is set independently; a later message only
//! overwrites its own field. The record is taken as a whole on flush.

use serde::{Deserialize, Serialize};
use sl_protocol::{PayoutFailed, PayoutSent, SpinOutcome};

/// Result of the payout that follows an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayoutResult {
    Sent(PayoutSent),
    Failed(PayoutFailed),
}

impl PayoutResult {
    pub fn payout_amount(&self) -> u64 {
        match self {
            Self::Sent(sent) => sent.payout_amount,
            Self::Failed(failed) => failed.payout_amount,
        }
    }

    /// Balance carried by the payout, if any
    pub fn balance_sats(&self) -> Option<u64> {
        match self {
            Self::Sent(sent) => sent.balance_sats,
            Self::Failed(_) => None,
        }
    }
}

/// Deferred visible updates for one reveal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingReveal {
    pub outcome: Option<SpinOutcome>,
    pub payout_result: Option<PayoutResult>,
    pub wallet_balance: Option<u64>,
}

impl PendingReveal {
    pub fn is_empty(&self) -> bool {
        self.outcome.is_none() && self.payout_result.is_none() && self.wallet_balance.is_none()
    }
}

/// Holds at most one [`PendingReveal`]
#[derive(Debug, Default)]
pub struct PendingUpdateQueue {
    pending: Option<PendingReveal>,
    flushes: u64,
    discards: u64,
}

impl PendingUpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self) -> &mut PendingReveal {
        self.pending.get_or_insert_with(PendingReveal::default)
    }

    pub fn defer_outcome(&mut self, outcome: SpinOutcome) {
        self.record().outcome = Some(outcome);
    }

    pub fn defer_payout(&mut self, result: PayoutResult) {
        let balance = result.balance_sats();
        let record = self.record();
        record.payout_result = Some(result);
        if let Some(balance) = balance {
            record.wallet_balance = Some(balance);
        }
    }

    pub fn defer_balance(&mut self, balance_sats: u64) {
        self.record().wallet_balance = Some(balance_sats);
    }

    /// Drop a deferred balance superseded by an immediate one
    pub fn clear_balance(&mut self) {
        if let Some(record) = self.pending.as_mut() {
            record.wallet_balance = None;
            if record.is_empty() {
                self.pending = None;
            }
        }
    }

    /// Take everything stored. `None` if nothing was deferred.
    pub fn flush(&mut self) -> Option<PendingReveal> {
        let record = self.pending.take().filter(|r| !r.is_empty())?;
        self.flushes += 1;
        Some(record)
    }

    /// Throw away everything stored. Returns true if anything was dropped.
    pub fn discard(&mut self) -> bool {
        let dropped = self.pending.take().is_some_and(|r| !r.is_empty());
        if dropped {
            self.discards += 1;
        }
        dropped
    }

    pub fn peek(&self) -> Option<&PendingReveal> {
        self.pending.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.as_ref().is_none_or(PendingReveal::is_empty)
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn discard_count(&self) -> u64 {
        self.discards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(amount: u64, balance: Option<u64>) -> PayoutResult {
        PayoutResult::Sent(PayoutSent {
            payout_amount: amount,
            recipient: "alice@example.com".into(),
            credited_to_wallet: true,
            balance_sats: balance,
        })
    }

    #[test]
    fn test_fields_merge_independently() {
        let mut queue = PendingUpdateQueue::new();
        queue.defer_outcome(SpinOutcome::new(100, 50));
        queue.defer_balance(900);
        queue.defer_outcome(SpinOutcome::new(100, 80));

        let record = queue.flush().unwrap();
        assert_eq!(record.outcome.unwrap().payout_amount, 80);
        assert_eq!(record.wallet_balance, Some(900));
        assert!(record.payout_result.is_none());
        assert!(queue.flush().is_none());
        assert_eq!(queue.flush_count(), 1);
    }

    #[test]
    fn test_payout_balance_feeds_balance_field() {
        let mut queue = PendingUpdateQueue::new();
        queue.defer_payout(sent(50, Some(1050)));
        assert_eq!(queue.peek().unwrap().wallet_balance, Some(1050));

        // Payout without a balance leaves the field alone
        queue.defer_payout(sent(50, None));
        assert_eq!(queue.peek().unwrap().wallet_balance, Some(1050));
    }

    #[test]
    fn test_discard() {
        let mut queue = PendingUpdateQueue::new();
        assert!(!queue.discard());
        queue.defer_balance(10);
        assert!(queue.discard());
        assert!(queue.is_empty());
        assert!(queue.flush().is_none());
        assert_eq!(queue.discard_count(), 1);
    }

    #[test]
    fn test_clear_balance_drops_empty_record() {
        let mut queue = PendingUpdateQueue::new();
        queue.defer_balance(10);
        queue.clear_balance();
        assert!(queue.peek().is_none());
    }
}

//! PaymentTracker - keeps the confirmation poll alive exactly while a
//! payment is outstanding

use serde::{Deserialize, Serialize};
use sl_protocol::PaymentRequest;

use crate::effect::ShellEffect;

/// Invoice the player still has to pay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingPayment {
    pub invoice_id: String,
    pub amount_sats: u64,
    pub payment_url: Option<String>,
}

/// Why a payment stopped being outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSettlement {
    Verified,
    Dismissed,
    Failed,
    Expired,
    Aborted,
}

#[derive(Debug)]
pub struct PaymentTracker {
    outstanding: Option<OutstandingPayment>,
    interval_ms: f64,
}

impl PaymentTracker {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            outstanding: None,
            interval_ms,
        }
    }

    /// Track a new invoice, replacing any previous one
    pub fn begin(
        &mut self,
        request: &PaymentRequest,
        effects: &mut Vec<ShellEffect>,
    ) -> &OutstandingPayment {
        if let Some(previous) = self.outstanding.take() {
            log::debug!(
                "[Poll] Invoice {} superseded by {}",
                previous.invoice_id,
                request.invoice_id
            );
            effects.push(ShellEffect::StopPaymentPoll);
        }

        effects.push(ShellEffect::StartPaymentPoll {
            invoice_id: request.invoice_id.clone(),
            interval_ms: self.interval_ms,
        });

        self.outstanding.insert(OutstandingPayment {
            invoice_id: request.invoice_id.clone(),
            amount_sats: request.amount_sats,
            payment_url: request.payment_url().map(str::to_string),
        })
    }

    /// Stop tracking. Emits `StopPaymentPoll` only if a poll was running.
    pub fn settle(
        &mut self,
        reason: PaymentSettlement,
        effects: &mut Vec<ShellEffect>,
    ) -> Option<OutstandingPayment> {
        let payment = self.outstanding.take()?;
        log::debug!("[Poll] Invoice {} settled: {:?}", payment.invoice_id, reason);
        effects.push(ShellEffect::StopPaymentPoll);
        Some(payment)
    }

    pub fn outstanding(&self) -> Option<&OutstandingPayment> {
        self.outstanding.as_ref()
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> PaymentRequest {
        PaymentRequest {
            invoice_id: id.into(),
            amount_sats: 100,
            hosted_invoice_url: Some("https://pay.example/inv".into()),
            speed_interface_url: None,
        }
    }

    #[test]
    fn test_begin_and_settle() {
        let mut tracker = PaymentTracker::new(2500.0);
        let mut effects = Vec::new();

        let payment = tracker.begin(&request("a"), &mut effects);
        assert_eq!(payment.payment_url.as_deref(), Some("https://pay.example/inv"));
        assert_eq!(
            effects,
            vec![ShellEffect::StartPaymentPoll {
                invoice_id: "a".into(),
                interval_ms: 2500.0
            }]
        );

        effects.clear();
        assert!(tracker.settle(PaymentSettlement::Verified, &mut effects).is_some());
        assert_eq!(effects, vec![ShellEffect::StopPaymentPoll]);

        // Nothing outstanding, nothing to stop
        effects.clear();
        assert!(tracker.settle(PaymentSettlement::Dismissed, &mut effects).is_none());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_new_invoice_replaces_poll() {
        let mut tracker = PaymentTracker::new(1000.0);
        let mut effects = Vec::new();
        tracker.begin(&request("a"), &mut effects);
        effects.clear();

        tracker.begin(&request("b"), &mut effects);
        assert_eq!(effects[0], ShellEffect::StopPaymentPoll);
        assert!(matches!(&effects[1], ShellEffect::StartPaymentPoll { invoice_id, .. } if invoice_id == "b"));
        assert_eq!(tracker.outstanding().unwrap().invoice_id, "b");
    }
}

//! Payment confirmation poll
//!
//! Sends `checkPayment` at a fixed interval. The first check goes out one
//! interval after the poll starts. Dropping the poll stops it.

use std::time::Duration;

use sl_protocol::OutboundRequest;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::tasks::TaskGuard;

#[derive(Debug)]
pub struct PaymentPoll {
    invoice_id: String,
    _task: TaskGuard,
}

impl PaymentPoll {
    pub fn start(invoice_id: String, interval: Duration, requests: mpsc::Sender<OutboundRequest>) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let id = invoice_id.clone();

        let task = TaskGuard::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                log::trace!("[Poll] checkPayment {}", id);
                let request = OutboundRequest::CheckPayment {
                    invoice_id: id.clone(),
                };
                if requests.send(request).await.is_err() {
                    log::debug!("[Poll] Request channel closed, stopping poll for {}", id);
                    break;
                }
            }
        });

        log::debug!("[Poll] Started for invoice {} every {:?}", invoice_id, interval);
        Self {
            invoice_id,
            _task: task,
        }
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }
}

impl Drop for PaymentPoll {
    fn drop(&mut self) {
        log::debug!("[Poll] Stopped for invoice {}", self.invoice_id);
    }
}

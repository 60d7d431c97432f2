//! Shell requests - client → authority communication
//!
//! The reveal core never sends anything itself. These are issued by the
//! surrounding shell: the user starting a spin, the payment poll, and the
//! balance re-request after a reconnect.

use serde::{Deserialize, Serialize};

/// Requests the shell can send to the authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum OutboundRequest {
    /// Ask for an invoice to start a spin
    #[serde(rename_all = "camelCase")]
    StartSpin {
        lightning_address: String,
        bet_amount: u64,
    },

    /// Poll whether an invoice has been paid
    #[serde(rename_all = "camelCase")]
    CheckPayment { invoice_id: String },

    /// Ask for a fresh balance snapshot
    #[serde(rename_all = "camelCase")]
    GetBalance {
        #[serde(skip_serializing_if = "Option::is_none")]
        lightning_address: Option<String>,
    },
}

impl OutboundRequest {
    /// Wire event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSpin { .. } => "startSpin",
            Self::CheckPayment { .. } => "checkPayment",
            Self::GetBalance { .. } => "getBalance",
        }
    }
}

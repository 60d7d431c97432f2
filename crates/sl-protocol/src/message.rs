//! Inbound authority messages
//!
//! Every message the reveal core consumes, decoded from the `data` part of a
//! frame. Numeric fields go through [`crate::numeric`] so that a malformed
//! amount degrades to zero (or is ignored) instead of failing the frame.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::numeric;

/// Table configuration pushed by the authority on connect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Selectable bet sizes (sats)
    #[serde(default, deserialize_with = "numeric::amount_list")]
    pub bet_options: Vec<u64>,

    /// Possible payouts per bet size
    #[serde(default, deserialize_with = "numeric::amount_table")]
    pub payout_table: BTreeMap<u64, Vec<u64>>,

    /// Weights parallel to `payout_table` rows
    #[serde(default, deserialize_with = "numeric::weight_table")]
    pub payout_weights: BTreeMap<u64, Vec<f64>>,
}

/// Immutable snapshot of one spin, as decided by the authority
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinOutcome {
    /// Bet paid for this spin
    #[serde(default, deserialize_with = "numeric::amount")]
    pub bet_amount: u64,

    /// Authoritative payout; the reel must land on this value
    #[serde(default, deserialize_with = "numeric::amount")]
    pub payout_amount: u64,

    /// Possible results for this bet (empty when missing or invalid)
    #[serde(default, deserialize_with = "numeric::amount_list")]
    pub payout_options: Vec<u64>,

    /// Weights parallel to `payout_options`
    #[serde(default, deserialize_with = "numeric::weight_list")]
    pub payout_weights: Option<Vec<f64>>,
}

impl SpinOutcome {
    pub fn new(bet_amount: u64, payout_amount: u64) -> Self {
        Self {
            bet_amount,
            payout_amount,
            payout_options: Vec::new(),
            payout_weights: None,
        }
    }

    pub fn with_options(mut self, options: Vec<u64>, weights: Option<Vec<f64>>) -> Self {
        self.payout_options = options;
        self.payout_weights = weights;
        self
    }
}

/// Successful payout notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSent {
    #[serde(default, deserialize_with = "numeric::amount")]
    pub payout_amount: u64,

    #[serde(default)]
    pub recipient: String,

    /// Payout was credited to the in-app wallet rather than sent out
    #[serde(default, deserialize_with = "numeric::lenient_bool")]
    pub credited_to_wallet: bool,

    /// Wallet balance after the credit, if the authority knows it
    #[serde(default, deserialize_with = "numeric::optional_amount")]
    pub balance_sats: Option<u64>,
}

/// Failed payout notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutFailed {
    #[serde(default, deserialize_with = "numeric::amount")]
    pub payout_amount: u64,

    #[serde(default)]
    pub recipient: String,

    #[serde(default)]
    pub error: String,
}

/// Balance push
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    /// `None` when the pushed value was not a valid amount
    #[serde(default, deserialize_with = "numeric::optional_amount")]
    pub balance_sats: Option<u64>,
}

/// Invoice issued for a pending spin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub invoice_id: String,

    #[serde(default, deserialize_with = "numeric::amount")]
    pub amount_sats: u64,

    #[serde(default)]
    pub hosted_invoice_url: Option<String>,

    #[serde(default)]
    pub speed_interface_url: Option<String>,
}

impl PaymentRequest {
    /// Preferred URL to open for payment
    pub fn payment_url(&self) -> Option<&str> {
        self.speed_interface_url
            .as_deref()
            .or(self.hosted_invoice_url.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerified {
    #[serde(default)]
    pub invoice_id: Option<String>,
}

/// Payload of `paymentFailed` / `paymentExpired`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalNotice {
    #[serde(default)]
    pub invoice_id: Option<String>,
}

/// Payload of `errorMessage`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    #[serde(default)]
    pub message: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// INBOUND MESSAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// A decoded authority message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    ServerInfo(ServerInfo),
    SpinOutcome(SpinOutcome),
    PayoutSent(PayoutSent),
    PayoutFailed(PayoutFailed),
    WalletBalance(WalletBalance),
    PaymentRequest(PaymentRequest),
    PaymentVerified(PaymentVerified),
    PaymentFailed(TerminalNotice),
    PaymentExpired(TerminalNotice),
    ErrorMessage(ErrorNotice),
}

impl InboundMessage {
    /// Decode a message from its event name and JSON payload
    pub fn from_event(event: &str, data: Value) -> ProtocolResult<Self> {
        // Payload-less events are sent with `null` or no data at all
        let data = if data.is_null() {
            Value::Object(Default::default())
        } else {
            data
        };

        let message = match event {
            "serverInfo" => Self::ServerInfo(decode(event, data)?),
            "spinOutcome" => {
                if data.get("payoutAmount").is_none() {
                    return Err(ProtocolError::MissingField("payoutAmount".into()));
                }
                Self::SpinOutcome(decode(event, data)?)
            }
            "payoutSent" => Self::PayoutSent(decode(event, data)?),
            "payoutFailed" => Self::PayoutFailed(decode(event, data)?),
            "walletBalance" => Self::WalletBalance(decode(event, data)?),
            "paymentRequest" => Self::PaymentRequest(decode(event, data)?),
            "paymentVerified" => Self::PaymentVerified(decode(event, data)?),
            "paymentFailed" => Self::PaymentFailed(decode(event, data)?),
            "paymentExpired" => Self::PaymentExpired(decode(event, data)?),
            "errorMessage" => Self::ErrorMessage(decode(event, data)?),
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };

        Ok(message)
    }

    /// Wire event name
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ServerInfo(_) => "serverInfo",
            Self::SpinOutcome(_) => "spinOutcome",
            Self::PayoutSent(_) => "payoutSent",
            Self::PayoutFailed(_) => "payoutFailed",
            Self::WalletBalance(_) => "walletBalance",
            Self::PaymentRequest(_) => "paymentRequest",
            Self::PaymentVerified(_) => "paymentVerified",
            Self::PaymentFailed(_) => "paymentFailed",
            Self::PaymentExpired(_) => "paymentExpired",
            Self::ErrorMessage(_) => "errorMessage",
        }
    }

    /// Terminal messages abort any in-flight reveal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaymentFailed(_) | Self::PaymentExpired(_) | Self::ErrorMessage(_)
        )
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> ProtocolResult<T> {
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

//! Wire frames
//!
//! Every message travels as `{ "type": <event>, "data": <payload> }`, with an
//! optional `id` for request correlation and a millisecond `timestamp`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolResult;
use crate::message::InboundMessage;
use crate::request::OutboundRequest;

/// Wire format for protocol messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFrame {
    /// Event name
    #[serde(rename = "type")]
    pub frame_type: String,

    /// Frame ID for request/response matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Frame payload
    #[serde(default)]
    pub data: Value,

    /// Timestamp (ms since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl ProtocolFrame {
    /// Create a frame for an arbitrary event
    pub fn new(frame_type: impl Into<String>, data: Value) -> Self {
        Self {
            frame_type: frame_type.into(),
            id: None,
            data,
            timestamp: None,
        }
    }

    /// Create an outbound request frame with a fresh correlation ID
    pub fn request(request: &OutboundRequest) -> ProtocolResult<Self> {
        let mut tagged = serde_json::to_value(request)?;
        let data = tagged
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null);

        Ok(Self {
            frame_type: request.name().to_string(),
            id: Some(uuid::Uuid::new_v4().to_string()),
            data,
            timestamp: Some(chrono::Utc::now().timestamp_millis() as f64),
        })
    }

    /// Parse a frame from text
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to text
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Interpret as an authority message
    pub fn into_message(self) -> ProtocolResult<InboundMessage> {
        InboundMessage::from_event(&self.frame_type, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_into_message() {
        let frame = ProtocolFrame::decode(r#"{"type":"walletBalance","data":{"balanceSats":1200}}"#)
            .unwrap();
        assert_eq!(frame.frame_type, "walletBalance");

        let msg = frame.into_message().unwrap();
        assert_eq!(msg.event_name(), "walletBalance");
    }

    #[test]
    fn test_decode_without_data() {
        let frame = ProtocolFrame::decode(r#"{"type":"paymentExpired"}"#).unwrap();
        assert!(frame.data.is_null());
        assert!(frame.into_message().unwrap().is_terminal());
    }

    #[test]
    fn test_request_frame() {
        let frame = ProtocolFrame::request(&OutboundRequest::CheckPayment {
            invoice_id: "inv-1".into(),
        })
        .unwrap();

        assert_eq!(frame.frame_type, "checkPayment");
        assert_eq!(frame.data, json!({ "invoiceId": "inv-1" }));
        assert!(frame.id.is_some());
        assert!(frame.timestamp.is_some());

        let text = frame.encode().unwrap();
        let back = ProtocolFrame::decode(&text).unwrap();
        assert_eq!(back.frame_type, "checkPayment");
    }

    #[test]
    fn test_malformed_text() {
        assert!(ProtocolFrame::decode("not json").is_err());
    }
}

//! Replay scripts
//!
//! One JSON object per line. Authority messages use the wire shape
//! (`{"type":"spinOutcome","data":{...}}`). A few pseudo-frames stand in for
//! what the shell would normally do:
//!
//! ```text
//!  disconnect   connection lost
//!  reconnect    connection restored
//!  dismiss      player closes the invoice
//!  bet          select data.amount
//!  layout       reel resized (data.itemWidth, data.viewportWidth)
//!  wait         pause data.ms
//! ```
//!
//! Any line may carry `"delayMs"` to pause before it is delivered. Blank
//! lines and lines starting with `#` are skipped.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use sl_connector::decode_frame;
use sl_reveal::{ReelMetrics, RevealEvent};

/// One step of a replay
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Wait(Duration),
    Deliver(RevealEvent),
}

/// Read and parse a script file
pub fn load(path: &Path) -> Result<Vec<ScriptStep>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse(&text).with_context(|| format!("Invalid script {}", path.display()))
}

pub fn parse(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = index + 1;

        let value: Value =
            serde_json::from_str(line).with_context(|| format!("line {}: not a JSON object", line_no))?;

        if let Some(delay) = value.get("delayMs") {
            let delay = millis(delay).with_context(|| format!("line {}: bad delayMs", line_no))?;
            steps.push(ScriptStep::Wait(delay));
        }

        if let Some(step) = parse_step(&value, line).with_context(|| format!("line {}", line_no))? {
            steps.push(step);
        }
    }

    Ok(steps)
}

fn parse_step(value: &Value, line: &str) -> Result<Option<ScriptStep>> {
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        bail!("missing \"type\"");
    };
    let data = value.get("data").unwrap_or(&Value::Null);

    let step = match kind {
        "disconnect" => ScriptStep::Deliver(RevealEvent::ConnectionLost),
        "reconnect" => ScriptStep::Deliver(RevealEvent::ConnectionRestored),
        "dismiss" => ScriptStep::Deliver(RevealEvent::PaymentDismissed),
        "bet" => {
            let amount = data
                .get("amount")
                .and_then(Value::as_u64)
                .context("bet needs data.amount")?;
            ScriptStep::Deliver(RevealEvent::BetSelected(amount))
        }
        "layout" => {
            let item_width = width(data, "itemWidth")?;
            let viewport_width = width(data, "viewportWidth")?;
            ScriptStep::Deliver(RevealEvent::LayoutChanged(ReelMetrics::new(
                item_width,
                viewport_width,
            )))
        }
        "wait" => ScriptStep::Wait(millis(data.get("ms").unwrap_or(&Value::Null))?),
        _ => match decode_frame(line) {
            Some(event) => ScriptStep::Deliver(event),
            None => {
                log::warn!("[Script] Skipping undeliverable {} frame", kind);
                return Ok(None);
            }
        },
    };

    Ok(Some(step))
}

fn millis(value: &Value) -> Result<Duration> {
    match value.as_u64() {
        Some(ms) => Ok(Duration::from_millis(ms)),
        None => bail!("expected milliseconds, got {}", value),
    }
}

fn width(data: &Value, key: &str) -> Result<f64> {
    data.get(key)
        .and_then(Value::as_f64)
        .with_context(|| format!("layout needs data.{}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_reveal::{InboundMessage, SpinOutcome};

    #[test]
    fn test_parse_mixed_script() {
        let script = r#"
# a spin that lands while the connection blips
{"type":"bet","data":{"amount":100}}
{"type":"spinOutcome","data":{"betAmount":100,"payoutAmount":50}}
{"type":"disconnect","delayMs":200}

{"type":"reconnect"}
{"type":"wait","data":{"ms":1500}}
"#;
        let steps = parse(script).unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Deliver(RevealEvent::BetSelected(100)),
                ScriptStep::Deliver(RevealEvent::Inbound(InboundMessage::SpinOutcome(
                    SpinOutcome::new(100, 50)
                ))),
                ScriptStep::Wait(Duration::from_millis(200)),
                ScriptStep::Deliver(RevealEvent::ConnectionLost),
                ScriptStep::Deliver(RevealEvent::ConnectionRestored),
                ScriptStep::Wait(Duration::from_millis(1500)),
            ]
        );
    }

    #[test]
    fn test_layout_and_dismiss() {
        let steps = parse(
            "{\"type\":\"layout\",\"data\":{\"itemWidth\":80,\"viewportWidth\":400}}\n{\"type\":\"dismiss\"}",
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Deliver(RevealEvent::LayoutChanged(ReelMetrics::new(80.0, 400.0))),
                ScriptStep::Deliver(RevealEvent::PaymentDismissed),
            ]
        );
    }

    #[test]
    fn test_undeliverable_frames_are_skipped() {
        let steps = parse(
            "{\"type\":\"jackpot\",\"data\":{}}\n{\"type\":\"spinOutcome\",\"data\":{\"betAmount\":20}}",
        )
        .unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse("{\"type\":\"reconnect\"}\nnot json").unwrap_err();
        assert_eq!(err.to_string(), "line 2: not a JSON object");

        let err = parse("{\"type\":\"bet\",\"data\":{}}").unwrap_err();
        assert_eq!(err.to_string(), "line 1");
        assert!(format!("{:#}", err).contains("bet needs data.amount"));

        assert!(parse("{\"data\":{}}").is_err());
        assert!(parse("{\"type\":\"wait\",\"data\":{\"ms\":-5}}").is_err());
    }
}

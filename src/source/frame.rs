//! Wire format of inbound events.
//!
//! The backend wraps every event in a `chuckt` envelope:
//!
//! ```json
//! {"chuckt": {"event": "stats-web-ZXA=", "args": [{"cpu": 1.5, "mem": 0.3}, []]}}
//! ```
//!
//! The first element of `args` holds the keyword arguments and becomes the
//! event payload. Outbound messages are plain JSON and need no envelope.

use serde_json::{json, Map, Value};

use super::InboundEvent;
use crate::error::FrameError;

/// Decode one text frame.
pub fn decode(text: &str) -> Result<InboundEvent, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let envelope = value.get("chuckt").ok_or(FrameError::MissingEnvelope)?;
    let name = envelope
        .get("event")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingEvent)?;
    let payload = envelope
        .get("args")
        .and_then(|args| args.get(0))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    Ok(InboundEvent::new(name, payload))
}

/// Encode an event the way the backend does.
pub fn encode(event: &InboundEvent) -> String {
    json!({"chuckt": {"event": event.name, "args": [event.payload, []]}}).to_string()
}

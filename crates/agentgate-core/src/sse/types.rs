//! Parsed SSE event block.

use serde_json::Value;

/// One blank-line delimited block from an SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBlock {
    /// The `event:` label of the block, if any.
    pub event_type: Option<String>,
    /// The decoded `data:` payload, always a JSON object.
    ///
    /// Object payloads carry the block label under `event` unless they
    /// already had that key; anything else is wrapped as
    /// `{"data": <value>, "event": <label or null>}`.
    pub payload: Value,
}

impl EventBlock {
    /// The label used to classify this block.
    ///
    /// An `event` key present in the payload takes precedence over the
    /// `event:` line.
    pub fn label(&self) -> Option<&str> {
        self.payload.get("event").and_then(Value::as_str)
    }

    /// Field of the payload object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// String field of the payload object, empty strings treated as absent.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

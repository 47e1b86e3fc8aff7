//! SSE block parser.
//!
//! Implements tolerant reader pattern: payloads that are not JSON objects are
//! wrapped, unknown line prefixes are ignored, and parsing never fails.

use serde_json::{Map, Value};

use super::types::EventBlock;

/// Parse the lines of one block into an event.
///
/// Returns `None` when the block carries no data.
pub fn parse_block<S: AsRef<str>>(lines: &[S]) -> Option<EventBlock> {
    let mut event_type: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in lines {
        let line = line.as_ref();
        if let Some(rest) = line.strip_prefix("event:") {
            event_type = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start());
        }
    }

    let joined = data_lines.join("\n");
    let data = joined.trim();
    if data.is_empty() {
        return None;
    }

    let label = event_type
        .as_ref()
        .filter(|t| !t.is_empty())
        .map_or(Value::Null, |t| Value::String(t.clone()));

    let payload = match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(mut obj)) => {
            if !label.is_null() && !obj.contains_key("event") {
                obj.insert("event".to_string(), label);
            }
            Value::Object(obj)
        }
        Ok(other) => wrap(other, label),
        Err(_) => wrap(Value::String(data.to_string()), label),
    };

    Some(EventBlock {
        event_type,
        payload,
    })
}

fn wrap(data: Value, label: Value) -> Value {
    let mut obj = Map::new();
    obj.insert("data".to_string(), data);
    obj.insert("event".to_string(), label);
    Value::Object(obj)
}

/// Incremental block assembler fed one line at a time.
#[derive(Debug, Default)]
pub struct BlockParser {
    lines: Vec<String>,
}

impl BlockParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator).
    ///
    /// A blank line closes the pending block and yields it if it carried data.
    pub fn push_line(&mut self, line: &str) -> Option<EventBlock> {
        if line.is_empty() {
            if self.lines.is_empty() {
                return None;
            }
            let lines = std::mem::take(&mut self.lines);
            return parse_block(&lines);
        }
        self.lines.push(line.to_string());
        None
    }

    /// Whether a block has been started but not yet terminated.
    pub fn has_pending(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Lazily parse a finite line sequence into blocks.
///
/// A final block with no terminating blank line is discarded, matching SSE
/// dispatch rules.
pub fn parse_lines<I>(lines: I) -> impl Iterator<Item = EventBlock>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut parser = BlockParser::new();
    lines
        .into_iter()
        .filter_map(move |line| parser.push_line(line.as_ref()))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_delta_block_gets_event_injected() {
        let blocks: Vec<_> = parse_lines([
            "event: response.text.delta",
            r#"data: {"text":"hi"}"#,
            "",
        ])
        .collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].payload,
            json!({"text": "hi", "event": "response.text.delta"})
        );
        assert_eq!(blocks[0].label(), Some("response.text.delta"));
    }

    #[test]
    fn existing_event_key_is_not_overwritten() {
        let block = parse_block(&["event: outer", r#"data: {"event":"inner","x":1}"#]).unwrap();
        assert_eq!(block.payload, json!({"event": "inner", "x": 1}));
        assert_eq!(block.label(), Some("inner"));
        assert_eq!(block.event_type.as_deref(), Some("outer"));
    }

    #[test]
    fn invalid_json_is_wrapped_as_raw_string() {
        let block = parse_block(&["data: not-json"]).unwrap();
        assert_eq!(block.payload, json!({"data": "not-json", "event": null}));
        assert_eq!(block.label(), None);
    }

    #[test]
    fn non_object_json_is_wrapped() {
        let block = parse_block(&["event: tick", "data: [1, 2]"]).unwrap();
        assert_eq!(block.payload, json!({"data": [1, 2], "event": "tick"}));

        let block = parse_block(&["data: 42"]).unwrap();
        assert_eq!(block.payload, json!({"data": 42, "event": null}));
    }

    #[test]
    fn multiple_data_lines_are_newline_joined() {
        let block = parse_block(&["data: {\"a\":", "data:   1}"]).unwrap();
        assert_eq!(block.payload, json!({"a": 1}));

        let block = parse_block(&["data: one", "data: two"]).unwrap();
        assert_eq!(block.payload["data"], json!("one\ntwo"));
    }

    #[test]
    fn blocks_without_data_yield_nothing() {
        assert!(parse_block(&["event: response.status"]).is_none());
        assert!(parse_block(&["data:    "]).is_none());
        assert!(parse_block::<&str>(&[]).is_none());
    }

    #[test]
    fn unknown_prefixes_are_ignored() {
        let block = parse_block(&[": keep-alive", "id: 7", "retry: 100", r#"data: {"ok":true}"#])
            .unwrap();
        assert_eq!(block.payload, json!({"ok": true}));
    }

    #[test]
    fn empty_event_label_is_not_injected() {
        let block = parse_block(&["event:", r#"data: {"a":1}"#]).unwrap();
        assert_eq!(block.payload, json!({"a": 1}));
    }

    #[test]
    fn consecutive_blank_lines_do_not_emit_empty_blocks() {
        let blocks: Vec<_> =
            parse_lines(["", "", "data: {\"n\":1}", "", "", "data: {\"n\":2}", ""]).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].payload, json!({"n": 2}));
    }

    #[test]
    fn unterminated_trailing_block_is_discarded() {
        let blocks: Vec<_> = parse_lines(["data: {\"n\":1}", "", "data: {\"n\":2}"]).collect();
        assert_eq!(blocks.len(), 1);

        let mut parser = BlockParser::new();
        assert!(parser.push_line("data: {}").is_none());
        assert!(parser.has_pending());
    }
}

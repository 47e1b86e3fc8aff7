//! Upstream event to downstream frame reclassification.
//!
//! The agent run stream uses a wide event vocabulary; the browser only
//! understands six frame kinds. Each upstream block maps to at most one frame.

use serde_json::Value;
use tracing::debug;

use agentgate_core::sse::EventBlock;

use super::types::AgentFrame;

/// Upstream event kinds the relay understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    ThinkingDelta,
    TextDelta,
    Table,
    Chart,
    ToolUse,
    AnalystDelta,
    Status,
    Error,
}

impl UpstreamKind {
    pub fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "response.thinking.delta" => Self::ThinkingDelta,
            "response.text.delta" => Self::TextDelta,
            "response.table" => Self::Table,
            "response.chart" => Self::Chart,
            "response.tool_use" => Self::ToolUse,
            "response.tool_result.analyst.delta" => Self::AnalystDelta,
            "response.status" => Self::Status,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

/// Map one parsed block to the frame the browser should see, if any.
pub fn classify(block: &EventBlock) -> Option<AgentFrame> {
    let Some(kind) = block.label().and_then(UpstreamKind::from_label) else {
        debug!(label = ?block.label(), "Skipping unclassified upstream event");
        return None;
    };

    match kind {
        UpstreamKind::ThinkingDelta => block.str_field("text").map(|t| AgentFrame::Thinking {
            content: t.to_string(),
        }),
        UpstreamKind::TextDelta => block.str_field("text").map(|t| AgentFrame::Message {
            content: t.to_string(),
        }),
        UpstreamKind::Table => ["table", "json", "content"]
            .iter()
            .filter_map(|key| block.get(key))
            .find(|v| is_truthy(v))
            .map(|data| AgentFrame::Table { data: data.clone() }),
        UpstreamKind::Chart => {
            extract_chart_spec(&block.payload).map(|chart_spec| AgentFrame::Chart { chart_spec })
        }
        UpstreamKind::ToolUse => block
            .str_field("tool_name")
            .or_else(|| block.str_field("tool_type"))
            .map(|tool| AgentFrame::Status {
                content: format!("🔧 Using tool: {tool}"),
            }),
        UpstreamKind::AnalystDelta => handle_analyst_delta(block),
        UpstreamKind::Status => block.str_field("message").map(|m| AgentFrame::Status {
            content: format!("⏳ {m}"),
        }),
        UpstreamKind::Error => {
            let message = block
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            Some(AgentFrame::Message {
                content: format!("⚠️ Error: {message}"),
            })
        }
    }
}

fn handle_analyst_delta(block: &EventBlock) -> Option<AgentFrame> {
    let delta = block.get("delta")?.as_object()?;
    let sql = delta
        .get("sql")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?;
    let explanation = delta
        .get("sql_explanation")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    Some(AgentFrame::Sql {
        sql: sql.to_string(),
        explanation,
    })
}

// =============================================================================
// Chart extraction
// =============================================================================

type ChartExtractor = fn(&Value) -> Option<String>;

/// Tried in order; the first hit wins.
const CHART_EXTRACTORS: &[ChartExtractor] = &[
    top_level_chart_spec,
    nested_chart_spec,
    inline_chart_object,
    inline_json_object,
];

fn extract_chart_spec(payload: &Value) -> Option<String> {
    CHART_EXTRACTORS
        .iter()
        .find_map(|extract| extract(payload))
        .filter(|spec| !spec.is_empty())
}

fn top_level_chart_spec(payload: &Value) -> Option<String> {
    payload.get("chart_spec")?.as_str().map(ToString::to_string)
}

fn nested_chart_spec(payload: &Value) -> Option<String> {
    payload
        .get("chart")?
        .get("chart_spec")?
        .as_str()
        .map(ToString::to_string)
}

fn inline_chart_object(payload: &Value) -> Option<String> {
    serialize_if_vega(payload.get("chart")?)
}

fn inline_json_object(payload: &Value) -> Option<String> {
    serialize_if_vega(payload.get("json")?)
}

/// Serialize an object that looks like a Vega-Lite spec.
fn serialize_if_vega(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    let looks_like_spec = ["mark", "encoding"]
        .iter()
        .any(|key| obj.get(*key).is_some_and(is_truthy));
    if !looks_like_spec {
        return None;
    }
    serde_json::to_string(value).ok()
}

/// Whether a JSON value counts as present: not null, false, zero or empty.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

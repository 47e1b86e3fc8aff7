//! Relay module types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A frame sent to the browser.
///
/// Serialized with a `type` tag, e.g. `{"type":"message","content":"hi"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentFrame {
    Thinking { content: String },
    Message { content: String },
    Status { content: String },
    Table { data: serde_json::Value },
    Chart { chart_spec: String },
    Sql {
        sql: String,
        explanation: Option<String>,
    },
}

/// Anything written to the outbound event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Agent(AgentFrame),
    /// Terminal failure, rendered as `{"error": ...}`.
    Error(String),
    /// End-of-turn sentinel, rendered as `[DONE]`.
    Done,
}

impl OutboundFrame {
    /// The `data:` payload of this frame.
    pub fn to_data(&self) -> String {
        match self {
            Self::Agent(frame) => serde_json::to_string(frame)
                .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string()),
            Self::Error(message) => serde_json::json!({ "error": message }).to_string(),
            Self::Done => "[DONE]".to_string(),
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Lifecycle of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Connecting,
    Streaming,
    Completed,
    Failed,
}

/// Fully qualified agent to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTarget {
    pub database: String,
    pub schema: String,
    pub name: String,
}

/// Body of `POST /agent/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentRunRequest {
    #[serde(default)]
    pub agent_database: Option<String>,
    #[serde(default)]
    pub agent_schema: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AgentRunRequest {
    /// Split into target and message, or name every missing field.
    pub fn into_parts(self) -> Result<(AgentTarget, String), Vec<&'static str>> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let database = present(self.agent_database);
        let schema = present(self.agent_schema);
        let name = present(self.agent_name);
        let message = present(self.message);

        match (database, schema, name, message) {
            (Some(database), Some(schema), Some(name), Some(message)) => Ok((
                AgentTarget {
                    database,
                    schema,
                    name,
                },
                message,
            )),
            (database, schema, name, message) => {
                let mut missing = Vec::new();
                if database.is_none() {
                    missing.push("agent_database");
                }
                if schema.is_none() {
                    missing.push("agent_schema");
                }
                if name.is_none() {
                    missing.push("agent_name");
                }
                if message.is_none() {
                    missing.push("message");
                }
                Err(missing)
            }
        }
    }
}

/// Errors from relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Invalid agent target: {0}")]
    InvalidTarget(String),
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(frame: AgentFrame) -> serde_json::Value {
        serde_json::from_str(&OutboundFrame::Agent(frame).to_data()).unwrap()
    }

    #[test]
    fn frames_serialize_with_type_tag() {
        assert_eq!(
            data(AgentFrame::Message { content: "hi".into() }),
            json!({"type": "message", "content": "hi"})
        );
        assert_eq!(
            data(AgentFrame::Chart { chart_spec: "{}".into() }),
            json!({"type": "chart", "chart_spec": "{}"})
        );
        assert_eq!(
            data(AgentFrame::Table { data: json!([[1]]) }),
            json!({"type": "table", "data": [[1]]})
        );
    }

    #[test]
    fn sql_frame_keeps_null_explanation() {
        assert_eq!(
            data(AgentFrame::Sql {
                sql: "SELECT 1".into(),
                explanation: None
            }),
            json!({"type": "sql", "sql": "SELECT 1", "explanation": null})
        );
    }

    #[test]
    fn error_and_sentinel_render_as_terminal_payloads() {
        assert_eq!(
            OutboundFrame::Error("rate limited".into()).to_data(),
            r#"{"error":"rate limited"}"#
        );
        assert_eq!(OutboundFrame::Done.to_data(), "[DONE]");
        assert!(OutboundFrame::Done.is_terminal());
        assert!(!OutboundFrame::Error(String::new()).is_terminal());
    }

    #[test]
    fn run_request_names_missing_fields() {
        let req: AgentRunRequest = serde_json::from_value(json!({
            "agent_database": "SALES",
            "agent_name": "  ",
            "message": "hello"
        }))
        .unwrap();
        assert_eq!(req.into_parts().unwrap_err(), vec!["agent_schema", "agent_name"]);
    }

    #[test]
    fn complete_run_request_splits_into_target() {
        let req: AgentRunRequest = serde_json::from_value(json!({
            "agent_database": "SALES",
            "agent_schema": "AGENTS",
            "agent_name": "Sales Agent",
            "message": "top customers?"
        }))
        .unwrap();
        let (target, message) = req.into_parts().unwrap();
        assert_eq!(target.name, "Sales Agent");
        assert_eq!(message, "top customers?");
    }
}

//! SQL statements API client.
//!
//! Statements run synchronously under the user's OAuth token; results come
//! back as string cells alongside column metadata.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use super::client::WarehouseError;
use super::types::{AgentSummary, SessionContext, StatementRequest, StatementResponse, StatementResult};
use crate::config::WarehouseConfig;

const CONTEXT_QUERY: &str =
    "SELECT CURRENT_USER(), CURRENT_ROLE(), CURRENT_DATABASE(), CURRENT_SCHEMA(), CURRENT_TIMESTAMP()";

/// Client for `POST /api/v2/statements`.
#[derive(Debug, Clone)]
pub struct StatementClient {
    http: reqwest::Client,
    config: WarehouseConfig,
    host: String,
    timeout: Duration,
}

impl StatementClient {
    pub fn new(config: &WarehouseConfig, timeout: Duration) -> Result<Self, WarehouseError> {
        if config.account.trim().is_empty() {
            return Err(WarehouseError::Config("account is empty".into()));
        }

        // reqwest is built with rustls-no-provider; a second install is a no-op error.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("agentgate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout + Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            host: config.host(),
            config: config.clone(),
            timeout,
        })
    }

    pub(crate) fn statements_url(&self) -> String {
        format!("https://{}/api/v2/statements", self.host)
    }

    /// Execute one statement and collect its first result partition.
    pub async fn execute(
        &self,
        access_token: &str,
        statement: &str,
    ) -> Result<StatementResult, WarehouseError> {
        let body = StatementRequest {
            statement,
            timeout: self.timeout.as_secs(),
            warehouse: &self.config.warehouse,
            database: &self.config.database,
            schema: &self.config.schema,
            role: self.config.role.as_deref().filter(|r| !r.is_empty()),
        };

        let resp = self
            .http
            .post(self.statements_url())
            .bearer_auth(access_token)
            .header("X-Snowflake-Authorization-Token-Type", "OAUTH")
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        match status {
            StatusCode::OK => {
                let parsed: StatementResponse =
                    serde_json::from_str(&text).map_err(|e| WarehouseError::Statement {
                        status: status.as_u16(),
                        message: format!("unreadable result: {e}"),
                    })?;
                Ok(StatementResult::from_response(parsed))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WarehouseError::Unauthorized {
                status: status.as_u16(),
                message: error_message(&text, status),
            }),
            StatusCode::ACCEPTED => Err(WarehouseError::Statement {
                status: status.as_u16(),
                message: "statement still running after timeout".into(),
            }),
            _ => Err(WarehouseError::Statement {
                status: status.as_u16(),
                message: error_message(&text, status),
            }),
        }
    }

    /// Every agent visible to the user's role.
    pub async fn list_agents(&self, access_token: &str) -> Result<Vec<AgentSummary>, WarehouseError> {
        let result = self.execute(access_token, "SHOW AGENTS IN ACCOUNT").await?;
        Ok(result
            .records()
            .iter()
            .map(AgentSummary::from_record)
            .collect())
    }

    /// User, role, database, schema and server time of a fresh session.
    pub async fn session_context(&self, access_token: &str) -> Result<SessionContext, WarehouseError> {
        let result = self.execute(access_token, CONTEXT_QUERY).await?;
        let row = result.rows.first().map(Vec::as_slice).unwrap_or_default();
        Ok(SessionContext::from_row(row))
    }
}

/// The `message` field of a JSON error body, else the body, else the status.
pub(crate) fn error_message(body: &str, status: StatusCode) -> String {
    if body.trim().is_empty() {
        return format!("HTTP {}", status.as_u16());
    }
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or_else(|| body.to_string())
}

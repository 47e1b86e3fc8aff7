//! Upstream agent run transport.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use url::Url;

use super::types::{AgentTarget, RelayError};

/// Incremental reader over a streamed response body.
pub trait ChunkSource: Send + 'static {
    /// Next chunk of bytes, or `None` at end of stream.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, RelayError>> + Send;
}

/// Outcome of opening an agent run.
#[derive(Debug)]
pub enum UpstreamResponse<B> {
    /// HTTP 200: the body is an SSE stream.
    Streaming(B),
    /// Any other status, with the full response body.
    Rejected { status: u16, body: String },
}

/// Opens agent runs against the warehouse REST API.
pub trait AgentTransport: Send + Sync + 'static {
    type Body: ChunkSource;

    fn run_agent(
        &self,
        host: &str,
        rest_token: &str,
        target: &AgentTarget,
        message: &str,
    ) -> impl Future<Output = Result<UpstreamResponse<Self::Body>, RelayError>> + Send;
}

/// `https://<host>/api/v2/databases/<db>/schemas/<schema>/agents/<name>:run`
///
/// Each segment is percent-encoded, so agent names may contain spaces.
pub fn agent_run_url(host: &str, target: &AgentTarget) -> Result<Url, RelayError> {
    let mut url = Url::parse(&format!("https://{host}"))
        .map_err(|e| RelayError::InvalidTarget(format!("host {host:?}: {e}")))?;
    let run_segment = format!("{}:run", target.name);
    url.path_segments_mut()
        .map_err(|()| RelayError::InvalidTarget(format!("host {host:?} cannot be a base")))?
        .pop_if_empty()
        .extend([
            "api",
            "v2",
            "databases",
            target.database.as_str(),
            "schemas",
            target.schema.as_str(),
            "agents",
            run_segment.as_str(),
        ]);
    Ok(url)
}

/// Request body for a single-message streamed run.
pub(crate) fn run_body(message: &str) -> serde_json::Value {
    json!({
        "messages": [{
            "role": "user",
            "content": [{ "type": "text", "text": message }]
        }],
        "tool_choice": { "type": "auto" },
        "stream": true
    })
}

// =============================================================================
// reqwest implementation
// =============================================================================

/// reqwest-backed transport.
///
/// `timeout` bounds connecting and waiting for response headers, and each gap
/// between body chunks.
#[derive(Debug, Clone)]
pub struct HttpAgentTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpAgentTransport {
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        // reqwest is built with rustls-no-provider; a second install is a no-op error.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("agentgate/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self { http, timeout })
    }
}

impl AgentTransport for HttpAgentTransport {
    type Body = ResponseBody;

    async fn run_agent(
        &self,
        host: &str,
        rest_token: &str,
        target: &AgentTarget,
        message: &str,
    ) -> Result<UpstreamResponse<ResponseBody>, RelayError> {
        let request = self
            .http
            .post(agent_run_url(host, target)?)
            .header(AUTHORIZATION, format!("Snowflake Token=\"{rest_token}\""))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(&run_body(message))
            .send();

        let resp = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| RelayError::Timeout(self.timeout))??;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Ok(UpstreamResponse::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(UpstreamResponse::Streaming(ResponseBody(resp)))
    }
}

/// Streamed body of an accepted agent run.
#[derive(Debug)]
pub struct ResponseBody(reqwest::Response);

impl ChunkSource for ResponseBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
        Ok(self.0.chunk().await?.map(|bytes| bytes.to_vec()))
    }
}

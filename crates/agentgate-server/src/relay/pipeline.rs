//! Chat turn pipeline: upstream agent run → browser event stream.
//!
//! Data flow:
//! ```text
//! agent run body → LineDecoder → BlockParser → classify → OutboundFrame
//! ```
//!
//! Frames are yielded as soon as each block completes. Whatever happens
//! upstream, the stream ends with exactly one `Done` and the warehouse
//! session is released exactly once.

use std::sync::Arc;

use serde_json::Value;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

use agentgate_core::sse::{BlockParser, LineDecoder};
use agentgate_core::warehouse::WarehouseConnection;

use super::classify::classify;
use super::guard::ConnectionGuard;
use super::transport::{AgentTransport, ChunkSource, UpstreamResponse};
use super::types::{AgentTarget, OutboundFrame, TurnState};

/// Run one chat turn over an open warehouse session.
///
/// The session is owned by the returned stream; dropping the stream early
/// still closes it.
pub fn run_turn<C, T>(
    transport: Arc<T>,
    conn: C,
    target: AgentTarget,
    message: String,
) -> impl Stream<Item = OutboundFrame> + Send + 'static
where
    C: WarehouseConnection,
    T: AgentTransport,
{
    let host = conn.host().to_string();
    let rest_token = conn.rest_token().to_string();
    let guard = ConnectionGuard::new(conn);

    async_stream::stream! {
        let mut state = TurnState::Connecting;
        let mut frames = 0usize;
        debug!(agent = %target.name, host = %host, "Opening agent run");

        match transport.run_agent(&host, &rest_token, &target, &message).await {
            Err(e) => {
                warn!(agent = %target.name, error = %e, "Agent run request failed");
                state = TurnState::Failed;
                yield OutboundFrame::Error(e.to_string());
            }
            Ok(UpstreamResponse::Rejected { status, body }) => {
                warn!(agent = %target.name, status, "Agent run rejected");
                state = TurnState::Failed;
                yield OutboundFrame::Error(rejection_message(status, &body));
            }
            Ok(UpstreamResponse::Streaming(mut body)) => {
                state = TurnState::Streaming;
                let mut decoder = LineDecoder::new();
                let mut parser = BlockParser::new();
                while state == TurnState::Streaming {
                    match body.next_chunk().await {
                        Ok(Some(chunk)) => {
                            for line in decoder.push(&chunk) {
                                let Some(block) = parser.push_line(&line) else {
                                    continue;
                                };
                                if let Some(frame) = classify(&block) {
                                    frames += 1;
                                    yield OutboundFrame::Agent(frame);
                                }
                            }
                        }
                        Ok(None) => {
                            if let Some(line) = decoder.finish() {
                                parser.push_line(&line);
                            }
                            if parser.has_pending() {
                                debug!("Discarding unterminated trailing block");
                            }
                            state = TurnState::Completed;
                        }
                        Err(e) => {
                            warn!(agent = %target.name, error = %e, "Agent stream interrupted");
                            state = TurnState::Failed;
                            yield OutboundFrame::Error(e.to_string());
                        }
                    }
                }
            }
        }

        yield OutboundFrame::Done;
        guard.release().await;
        info!(agent = %target.name, ?state, frames, "Chat turn finished");
    }
}

/// Error text for a non-200 agent run: the JSON body's `message`, else the
/// raw body, else the status line.
pub fn rejection_message(status: u16, body: &str) -> String {
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => match obj.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

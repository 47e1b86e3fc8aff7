//! Agent chat relay.
//!
//! One relay turn per chat message: open the upstream agent run, reclassify
//! its SSE events into downstream frames, and release the warehouse session
//! exactly once however the turn ends.

mod classify;
mod guard;
mod pipeline;
mod transport;
mod types;


pub use classify::{UpstreamKind, classify};
pub use guard::ConnectionGuard;
pub use pipeline::{rejection_message, run_turn};
pub use transport::{AgentTransport, ChunkSource, HttpAgentTransport, UpstreamResponse, agent_run_url};
pub use types::{AgentFrame, AgentRunRequest, AgentTarget, OutboundFrame, RelayError, TurnState};

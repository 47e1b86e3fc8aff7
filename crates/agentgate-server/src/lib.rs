//! `agentgate` web app
//!
//! Browser chat with warehouse-hosted AI agents, authorised by the user's
//! own identity provider token:
//! - OAuth login with PKCE and in-memory sessions
//! - Streaming chat relay from the agent run API to the browser
//! - JSON API for agents, identity and connection checks

pub mod relay;
pub mod server;
pub mod session;

//! `agentgate` Core Library
//!
//! Shared functionality for `agentgate` components:
//! - SSE line decoding and event-block parsing for the agent run stream
//! - OAuth 2.0 authorization-code flow with PKCE against the identity provider
//! - Warehouse session login and SQL statement client
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod error;
pub mod oauth;
pub mod sse;
pub mod tracing_init;
pub mod warehouse;

pub use config::Config;
pub use error::{Error, Result};

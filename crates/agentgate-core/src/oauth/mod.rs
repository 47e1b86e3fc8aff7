//! Identity provider integration.
//!
//! Authorization-code flow with PKCE (S256) against an Okta-style
//! authorization server: authorize redirect, code exchange, refresh grant
//! and userinfo lookup.

mod client;
pub mod pkce;
mod types;


pub use client::{IdpClient, OAuthError};
pub use types::{AuthorizationRequest, CallbackParams, Identity, TokenResponse};

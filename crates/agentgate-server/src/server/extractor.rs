//! Session extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use agentgate_core::warehouse::WarehouseConnector;

use super::error::ApiError;
use super::state::AppState;
use crate::relay::AgentTransport;
use crate::session::Session;

/// Authenticated session resolved from the session cookie.
///
/// Rejects with `401` when the cookie is missing or the session has expired.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<W: WarehouseConnector, T: AgentTransport> FromRequestParts<AppState<W, T>> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<W, T>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = jar
            .get(&state.config.server.cookie_name)
            .map(|c| c.value().to_string())
            .ok_or(ApiError::Unauthenticated)?;

        state
            .sessions
            .get(&session_id)
            .await
            .map(Self)
            .ok_or(ApiError::SessionExpired)
    }
}

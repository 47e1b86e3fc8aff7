//! Login, callback, logout and token refresh routes.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use serde_json::{Value, json};
use tracing::{info, warn};

use agentgate_core::oauth::CallbackParams;
use agentgate_core::warehouse::WarehouseConnector;

use super::cookies::{clear_session_cookie, session_cookie};
use super::error::ApiError;
use super::extractor::CurrentSession;
use super::state::AppState;
use crate::relay::AgentTransport;
use crate::session::{Session, unix_now};

/// `GET /login`: start the authorization-code flow.
pub async fn login<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
) -> Result<Redirect, ApiError> {
    let swept = state.sessions.sweep(unix_now()).await;
    if swept.total() > 0 {
        info!(pending = swept.pending, sessions = swept.sessions, "Swept expired sessions");
    }

    let request = state
        .idp
        .authorization_url()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .sessions
        .insert_pending(request.state, request.code_verifier)
        .await;

    Ok(Redirect::to(&request.url))
}

/// `GET /callback`: finish the flow and open a session.
pub async fn callback<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(error) = params.error {
        if let Some(s) = params.state.as_deref() {
            state.sessions.take_pending(s).await;
        }
        let description = params.error_description.unwrap_or_default();
        warn!(error = %error, description = %description, "Identity provider returned an error");
        return Err(ApiError::BadRequest(format!(
            "Authorization failed: {error} {description}"
        )));
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return Err(ApiError::BadRequest("Missing code or state".into()));
    };

    let pending = state
        .sessions
        .take_pending(&oauth_state)
        .await
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired state".into()))?;

    let tokens = state
        .idp
        .exchange_code(&code, &pending.code_verifier)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Authentication failed: {e}")))?;

    let identity = state
        .idp
        .user_info(&tokens.access_token)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Authentication failed: {e}")))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    info!(
        login = identity.login_name(),
        client_id = state.idp.client_id(),
        has_refresh_token = tokens.refresh_token.is_some(),
        "User signed in"
    );
    state
        .sessions
        .create(Session {
            id: session_id.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            identity,
            client_id: state.idp.client_id().to_string(),
            created_at: unix_now(),
        })
        .await;

    let server = &state.config.server;
    let cookie = session_cookie(
        &server.cookie_name,
        &session_id,
        server.session_ttl_secs,
        server.cookie_secure,
    );
    Ok((jar.add(cookie), Redirect::to("/")))
}

/// `GET /logout`: drop the session and its cookie.
pub async fn logout<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let name = &state.config.server.cookie_name;
    if let Some(cookie) = jar.get(name) {
        if state.sessions.delete(cookie.value()).await {
            info!("User signed out");
        }
    }
    (jar.remove(clear_session_cookie(name)), Redirect::to("/"))
}

/// `GET /api/token/refresh`: trade the refresh token for a new access token.
pub async fn refresh_token<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Value>, ApiError> {
    let refresh = session
        .refresh_token
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("No refresh token available".into()))?;

    let tokens = state
        .idp
        .refresh(refresh)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Token refresh failed: {e}")))?;

    let rotated = tokens.refresh_token.is_some();
    if !state
        .sessions
        .update_tokens(&session.id, tokens.access_token, tokens.refresh_token)
        .await
    {
        return Err(ApiError::SessionExpired);
    }
    info!(rotated, "Access token refreshed");

    Ok(Json(json!({
        "message": "Token refreshed successfully",
        "expires_in": tokens.expires_in,
        "refresh_token_rotated": rotated,
    })))
}

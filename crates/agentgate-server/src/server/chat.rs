//! Streaming agent chat endpoint.

use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderValue;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::StreamExt;
use tracing::{info, warn};

use agentgate_core::warehouse::{WarehouseConnector, WarehouseLogin};

use super::error::ApiError;
use super::extractor::CurrentSession;
use super::state::AppState;
use crate::relay::{AgentRunRequest, AgentTransport, run_turn};

/// `POST /agent/chat`: relay one message to an agent as an event stream.
///
/// Authentication and warehouse login happen before the stream opens, so
/// those failures are plain HTTP errors. Everything after that arrives as
/// frames, ending with `data: [DONE]`.
pub async fn agent_chat<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    CurrentSession(session): CurrentSession,
    body: Result<Json<AgentRunRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (target, message) = request.into_parts().map_err(|missing| {
        ApiError::BadRequest(format!("Missing required fields: {}", missing.join(", ")))
    })?;

    let login = WarehouseLogin {
        login_name: session.identity.login_name().to_string(),
        access_token: session.access_token,
    };
    let conn = state.connector.connect(&login).await.map_err(|e| {
        warn!(login = %login.login_name, error = %e, "Warehouse login failed");
        ApiError::WarehouseLogin
    })?;

    info!(
        agent = %format!("{}.{}.{}", target.database, target.schema, target.name),
        login = %login.login_name,
        "Starting chat turn"
    );

    let frames = run_turn(
        std::sync::Arc::clone(&state.transport),
        conn,
        target,
        message,
    )
    .map(|frame| Ok::<_, Infallible>(Event::default().data(frame.to_data())));

    let mut response = Sse::new(frames).into_response();
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
        .headers_mut()
        .insert("cache-control", HeaderValue::from_static("no-cache"));
    Ok(response)
}

//! Health check.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use agentgate_core::warehouse::WarehouseConnector;

use super::state::AppState;
use crate::relay::AgentTransport;

/// `GET /health`
pub async fn health<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
) -> Json<Value> {
    let server = &state.config.server;
    let client_id = state.idp.client_id();
    let client_prefix: String = client_id.chars().take(12).collect();
    Json(json!({
        "status": "healthy",
        "message": format!("{} running", server.app_name),
        "app": server.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "port": server.port,
        "client_id": format!("{client_prefix}..."),
        "active_sessions": state.sessions.session_count().await,
    }))
}

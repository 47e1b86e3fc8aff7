//! JSON API for the signed-in user.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use agentgate_core::warehouse::{AgentSummary, WarehouseConnector};

use super::error::ApiError;
use super::extractor::CurrentSession;
use super::state::AppState;
use crate::relay::AgentTransport;

const DEFAULT_QUERY: &str = "SHOW TABLES LIMIT 5";

/// `GET /api/user`: identity claims of the current session.
pub async fn user<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    CurrentSession(session): CurrentSession,
) -> Json<Value> {
    Json(json!({
        "claims": session.identity,
        "login_name": session.identity.login_name(),
        "client_id": session.client_id,
        "issuer": state.idp.issuer(),
        "session_created_at": session.created_at,
    }))
}

/// `GET /api/agents`: agents visible to the user's default role.
pub async fn agents<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<AgentSummary>>, ApiError> {
    let agents = state
        .statements
        .list_agents(&session.access_token)
        .await
        .inspect_err(|e| warn!(error = %e, "Listing agents failed"))?;
    info!(count = agents.len(), "Listed agents");
    Ok(Json(agents))
}

/// `GET /api/warehouse/test`: prove the token is accepted by the warehouse.
pub async fn warehouse_test<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Value>, ApiError> {
    let context = state
        .statements
        .session_context(&session.access_token)
        .await
        .inspect_err(|e| warn!(error = %e, "Warehouse connection test failed"))?;
    Ok(Json(json!({
        "success": true,
        "message": "Warehouse connection successful",
        "client_id": session.client_id,
        "data": context,
    })))
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub query: Option<String>,
}

/// `GET /api/warehouse/query?query=...`: run one statement as the user.
pub async fn warehouse_query<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());
    let result = state.statements.execute(&session.access_token, &query).await?;
    Ok(Json(json!({
        "success": true,
        "query": query,
        "row_count": result.rows.len(),
        "columns": result.columns,
        "data": result.records(),
    })))
}

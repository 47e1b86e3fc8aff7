//! Router assembly.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use agentgate_core::warehouse::WarehouseConnector;

use super::state::AppState;
use super::{api, auth, chat, health, pages};
use crate::relay::AgentTransport;

/// Build the application router.
pub fn build_router<W: WarehouseConnector, T: AgentTransport>(state: AppState<W, T>) -> Router {
    Router::new()
        .route("/", get(pages::root::<W, T>))
        .route("/login", get(auth::login::<W, T>))
        .route("/callback", get(auth::callback::<W, T>))
        .route("/logout", get(auth::logout::<W, T>))
        .route("/health", get(health::health::<W, T>))
        .route("/api/user", get(api::user::<W, T>))
        .route("/api/agents", get(api::agents::<W, T>))
        .route("/api/warehouse/test", get(api::warehouse_test::<W, T>))
        .route("/api/warehouse/query", get(api::warehouse_query::<W, T>))
        .route("/api/token/refresh", get(auth::refresh_token::<W, T>))
        .route("/agent/chat", post(chat::agent_chat::<W, T>))
        .route("/api/cortex/agent/chat", post(chat::agent_chat::<W, T>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

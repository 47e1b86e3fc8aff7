//! HTML pages.

use axum::extract::State;
use axum::response::Html;
use axum_extra::extract::CookieJar;
use minijinja::{Environment, context};

use agentgate_core::Config;
use agentgate_core::warehouse::WarehouseConnector;

use super::error::ApiError;
use super::state::AppState;
use crate::relay::AgentTransport;
use crate::session::Session;

const LANDING: &str = "landing.html";
const CHAT: &str = "chat.html";

/// Embedded page templates.
///
/// Template names end in `.html`, so every substituted value is HTML-escaped.
#[derive(Debug)]
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(LANDING, include_str!("../../assets/landing.html"))?;
        env.add_template(CHAT, include_str!("../../assets/chat.html"))?;
        Ok(Self { env })
    }

    pub fn landing(&self, config: &Config) -> Result<String, minijinja::Error> {
        self.env.get_template(LANDING)?.render(context! {
            app_name => config.server.app_name,
            client_id => config.oauth.client_id,
            issuer => config.oauth.issuer.trim_end_matches('/'),
        })
    }

    pub fn chat(&self, config: &Config, session: &Session) -> Result<String, minijinja::Error> {
        self.env.get_template(CHAT)?.render(context! {
            app_name => config.server.app_name,
            user_name => session.identity.display_name(),
            user_login => session.identity.login_name(),
            client_id => session.client_id,
            default_database => config.warehouse.database,
            default_schema => config.warehouse.schema,
        })
    }
}

/// `GET /`: chat page when signed in, landing page otherwise.
pub async fn root<W: WarehouseConnector, T: AgentTransport>(
    State(state): State<AppState<W, T>>,
    jar: CookieJar,
) -> Result<Html<String>, ApiError> {
    let session = match jar.get(&state.config.server.cookie_name) {
        Some(cookie) => state.sessions.get(cookie.value()).await,
        None => None,
    };
    let page = match session {
        Some(session) => state.pages.chat(&state.config, &session),
        None => state.pages.landing(&state.config),
    };
    page.map(Html)
        .map_err(|e| ApiError::Internal(format!("page render failed: {e}")))
}

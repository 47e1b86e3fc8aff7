//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use agentgate_core::Config;
use agentgate_core::oauth::IdpClient;
use agentgate_core::warehouse::{SnowflakeConnector, StatementClient, WarehouseConnector};

use super::pages::Pages;
use crate::relay::{AgentTransport, HttpAgentTransport};
use crate::session::SessionStore;

/// State shared by every handler.
///
/// Generic over the warehouse connector and the agent transport so the chat
/// relay can run against in-process fakes.
pub struct AppState<W, T> {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub idp: Arc<IdpClient>,
    pub statements: Arc<StatementClient>,
    pub connector: Arc<W>,
    pub transport: Arc<T>,
    pub pages: Arc<Pages>,
}

// Manual Clone: avoid derive adding `W: Clone, T: Clone` bounds.
impl<W, T> Clone for AppState<W, T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            sessions: Arc::clone(&self.sessions),
            idp: Arc::clone(&self.idp),
            statements: Arc::clone(&self.statements),
            connector: Arc::clone(&self.connector),
            transport: Arc::clone(&self.transport),
            pages: Arc::clone(&self.pages),
        }
    }
}

/// State wired to the real identity provider and warehouse.
pub type LiveState = AppState<SnowflakeConnector, HttpAgentTransport>;

impl<W: WarehouseConnector, T: AgentTransport> AppState<W, T> {
    /// Assemble state around the given warehouse connector and transport.
    pub fn with_backends(config: Config, connector: W, transport: T) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.server.upstream_timeout_secs);
        let idp = IdpClient::new(&config.oauth)?;
        let statements = StatementClient::new(&config.warehouse, timeout)?;
        let sessions = SessionStore::new(
            Duration::from_secs(config.server.session_ttl_secs),
            Duration::from_secs(config.server.pending_ttl_secs),
        );
        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            idp: Arc::new(idp),
            statements: Arc::new(statements),
            connector: Arc::new(connector),
            transport: Arc::new(transport),
            pages: Arc::new(Pages::new()?),
        })
    }
}

impl LiveState {
    pub fn live(config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.server.upstream_timeout_secs);
        let connector = SnowflakeConnector::new(&config.warehouse, timeout)?;
        let transport = HttpAgentTransport::new(timeout)?;
        Self::with_backends(config, connector, transport)
    }
}

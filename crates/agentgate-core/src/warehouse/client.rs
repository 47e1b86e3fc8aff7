//! Warehouse session login.
//!
//! An OAuth access token is exchanged for a session whose REST token
//! authorises agent runs. Sessions are live server-side resources and must be
//! closed when the caller is done with them.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::types::{LoginRequest, LoginRequestData, LoginResponse, WarehouseLogin};
use crate::config::WarehouseConfig;

const CLIENT_APP_ID: &str = "agentgate";

/// Warehouse client errors.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Warehouse login rejected ({code}): {message}")]
    LoginRejected { code: String, message: String },

    #[error("Warehouse rejected the OAuth token ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Statement failed ({status}): {message}")]
    Statement { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WarehouseError {
    /// Whether the failure means the user's token is no longer accepted.
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::LoginRejected { .. } | Self::Unauthorized { .. })
    }
}

// =============================================================================
// Seams
// =============================================================================

/// Opens warehouse sessions for a user.
pub trait WarehouseConnector: Send + Sync + 'static {
    type Connection: WarehouseConnection;

    fn connect(
        &self,
        login: &WarehouseLogin,
    ) -> impl Future<Output = Result<Self::Connection, WarehouseError>> + Send;
}

/// A live warehouse session.
pub trait WarehouseConnection: Send + 'static {
    /// Token for `Authorization: Snowflake Token="..."`.
    fn rest_token(&self) -> &str;

    /// Routable hostname of the account.
    fn host(&self) -> &str;

    /// End the session. Failures are logged, not returned.
    fn close(self) -> impl Future<Output = ()> + Send;
}

// =============================================================================
// Snowflake implementation
// =============================================================================

/// Session login against `/session/v1/login-request`.
#[derive(Debug, Clone)]
pub struct SnowflakeConnector {
    http: reqwest::Client,
    config: WarehouseConfig,
    host: String,
}

impl SnowflakeConnector {
    pub fn new(config: &WarehouseConfig, timeout: Duration) -> Result<Self, WarehouseError> {
        if config.account.trim().is_empty() {
            return Err(WarehouseError::Config("account is empty".into()));
        }

        // reqwest is built with rustls-no-provider; a second install is a no-op error.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("agentgate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            host: config.host(),
            config: config.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn login_url(&self) -> Result<url::Url, WarehouseError> {
        let mut url = url::Url::parse(&format!("https://{}/session/v1/login-request", self.host))
            .map_err(|e| WarehouseError::Config(format!("invalid host: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("request_id", &uuid::Uuid::new_v4().to_string());
            if !self.config.warehouse.is_empty() {
                query.append_pair("warehouse", &self.config.warehouse);
            }
            if !self.config.database.is_empty() {
                query.append_pair("databaseName", &self.config.database);
            }
            if !self.config.schema.is_empty() {
                query.append_pair("schemaName", &self.config.schema);
            }
            if let Some(role) = self.config.role.as_deref().filter(|r| !r.is_empty()) {
                query.append_pair("roleName", role);
            }
        }
        Ok(url)
    }

    /// Account name as the login endpoint expects it: the part before any
    /// region or cloud suffix, upper-cased.
    pub(crate) fn account_name(&self) -> String {
        self.config
            .account
            .split('.')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }
}

impl WarehouseConnector for SnowflakeConnector {
    type Connection = SnowflakeSession;

    async fn connect(&self, login: &WarehouseLogin) -> Result<SnowflakeSession, WarehouseError> {
        let account_name = self.account_name();
        let body = LoginRequest {
            data: LoginRequestData {
                client_app_id: CLIENT_APP_ID,
                client_app_version: env!("CARGO_PKG_VERSION"),
                account_name: &account_name,
                login_name: &login.login_name,
                authenticator: "OAUTH",
                token: &login.access_token,
            },
        };

        let resp = self
            .http
            .post(self.login_url()?)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(WarehouseError::Unauthorized {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(WarehouseError::LoginRejected {
                code: status.as_u16().to_string(),
                message: status.canonical_reason().unwrap_or("Unknown").into(),
            });
        }

        let token = session_token(resp.json().await?)?;

        debug!(host = %self.host, login = %login.login_name, "Warehouse session opened");
        Ok(SnowflakeSession {
            http: self.http.clone(),
            host: self.host.clone(),
            token,
        })
    }
}

/// Pull the session token out of a login response.
///
/// The endpoint answers 200 even for rejected logins; `success` and `code`
/// carry the outcome.
pub(crate) fn session_token(resp: LoginResponse) -> Result<String, WarehouseError> {
    let token = resp
        .data
        .and_then(|d| d.token)
        .filter(|t| resp.success && !t.is_empty());
    token.ok_or_else(|| WarehouseError::LoginRejected {
        code: resp.code.unwrap_or_else(|| "unknown".into()),
        message: resp
            .message
            .unwrap_or_else(|| "login response carried no session token".into()),
    })
}

/// An open warehouse session.
#[derive(Debug)]
pub struct SnowflakeSession {
    http: reqwest::Client,
    host: String,
    token: String,
}

impl SnowflakeSession {
    pub(crate) fn close_url(&self) -> String {
        format!("https://{}/session?delete=true", self.host)
    }
}

impl WarehouseConnection for SnowflakeSession {
    fn rest_token(&self) -> &str {
        &self.token
    }

    fn host(&self) -> &str {
        &self.host
    }

    async fn close(self) {
        let result = self
            .http
            .post(self.close_url())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", self.token),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(host = %self.host, "Warehouse session closed");
            }
            Ok(resp) => warn!(host = %self.host, status = %resp.status(), "Session close rejected"),
            Err(e) => warn!(host = %self.host, error = %e, "Session close failed"),
        }
    }
}

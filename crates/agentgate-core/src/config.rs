//! Configuration resolution for agentgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (`--config` / `AGENTGATE_CONFIG`, JSON)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binaries)
//!
//! Two registered client applications of the same authorization server are
//! two instances of the server binary with different `oauth` sections.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Complete agentgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Identity provider client registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization server base URL, e.g. `https://example.okta.com/oauth2/default`.
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scope: "openid profile email offline_access session:role-any".to_string(),
        }
    }
}

/// Warehouse account and session context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Account identifier, e.g. `myorg-myaccount`.
    pub account: String,
    /// Explicit hostname; derived from `account` when unset.
    pub host: Option<String>,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
}

impl WarehouseConfig {
    /// Routable hostname for the account.
    ///
    /// Underscores are not valid in hostnames, so they are mapped to hyphens.
    pub fn host(&self) -> String {
        match &self.host {
            Some(host) if !host.is_empty() => host.clone(),
            _ => format!(
                "{}.snowflakecomputing.com",
                self.account.to_lowercase().replace('_', "-")
            ),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Display name shown on pages and in `/health`.
    pub app_name: String,
    /// Lifetime of an authenticated session (seconds).
    pub session_ttl_secs: u64,
    /// Lifetime of a login that has not returned from the IdP yet (seconds).
    pub pending_ttl_secs: u64,
    /// Overall timeout for one upstream agent call (seconds).
    pub upstream_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (enable behind HTTPS).
    pub cookie_secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8002,
            app_name: "agentgate".to_string(),
            session_ttl_secs: 3600,
            pending_ttl_secs: 600,
            upstream_timeout_secs: 60,
            sweep_interval_secs: 60,
            cookie_name: "session_id".to_string(),
            cookie_secure: false,
        }
    }
}

impl Config {
    /// Reject configurations that cannot complete a login.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("oauth.issuer", &self.oauth.issuer),
            ("oauth.client_id", &self.oauth.client_id),
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
            ("warehouse.account", &self.warehouse.account),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.server.session_ttl_secs == 0 || self.server.pending_ttl_secs == 0 {
            return Err(Error::Config("session TTLs must be non-zero".to_string()));
        }
        if self.server.upstream_timeout_secs == 0 {
            return Err(Error::Config(
                "server.upstream_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(config_file: Option<&Path>) -> Result<Config> {
    let mut config = match config_file {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply environment overrides read through `lookup`.
///
/// Unparseable numeric values are ignored and the previous value is kept.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let strings: [(&str, &mut String); 9] = [
        ("OKTA_ISSUER", &mut config.oauth.issuer),
        ("CLIENT_ID", &mut config.oauth.client_id),
        ("CLIENT_SECRET", &mut config.oauth.client_secret),
        ("REDIRECT_URI", &mut config.oauth.redirect_uri),
        ("SCOPE", &mut config.oauth.scope),
        ("SNOWFLAKE_ACCOUNT", &mut config.warehouse.account),
        ("SNOWFLAKE_WAREHOUSE", &mut config.warehouse.warehouse),
        ("SNOWFLAKE_DATABASE", &mut config.warehouse.database),
        ("SNOWFLAKE_SCHEMA", &mut config.warehouse.schema),
    ];
    for (key, slot) in strings {
        if let Some(val) = lookup(key) {
            *slot = val;
        }
    }
    if let Some(val) = lookup("SNOWFLAKE_HOST") {
        config.warehouse.host = Some(val);
    }
    if let Some(val) = lookup("SNOWFLAKE_ROLE") {
        config.warehouse.role = Some(val);
    }
    if let Some(val) = lookup("APP_NAME") {
        config.server.app_name = val;
    }
    if let Some(n) = lookup("APP_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = n;
    }
    if let Some(n) = lookup("UPSTREAM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.server.upstream_timeout_secs = n;
    }
    if let Some(val) = lookup("COOKIE_SECURE") {
        config.server.cookie_secure = matches!(val.as_str(), "1" | "true" | "yes");
    }
}

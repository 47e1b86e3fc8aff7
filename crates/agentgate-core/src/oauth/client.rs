//! Identity provider HTTP client.
//!
//! Endpoints follow the Okta authorization server layout under the issuer:
//! `/v1/authorize`, `/v1/token`, `/v1/userinfo`.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::pkce;
use super::types::{AuthorizationRequest, Identity, TokenResponse};
use crate::config::OAuthConfig;

/// Identity provider client errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed ({status}): {detail}")]
    Endpoint {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization callback rejected: {0}")]
    Callback(String),
}

/// Client for one registered application of the authorization server.
#[derive(Debug, Clone)]
pub struct IdpClient {
    http: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl IdpClient {
    /// Create a client for the configured application.
    pub fn new(config: &OAuthConfig) -> Result<Self, OAuthError> {
        if config.issuer.trim().is_empty() {
            return Err(OAuthError::Config("issuer is empty".into()));
        }
        if config.client_id.is_empty() {
            return Err(OAuthError::Config("client_id is empty".into()));
        }
        Url::parse(&config.issuer)
            .map_err(|e| OAuthError::Config(format!("invalid issuer URL: {e}")))?;

        // reqwest is built with rustls-no-provider; a second install is a no-op error.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("agentgate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            issuer: config.issuer.trim().trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn endpoint(&self, name: &str) -> String {
        format!("{}/v1/{name}", self.issuer)
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Build the authorize redirect with fresh PKCE and `state` values.
    pub fn authorization_url(&self) -> Result<AuthorizationRequest, OAuthError> {
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier();
        let url = self.authorization_url_with(&state, &code_verifier)?;
        Ok(AuthorizationRequest {
            url,
            state,
            code_verifier,
        })
    }

    pub(crate) fn authorization_url_with(
        &self,
        state: &str,
        code_verifier: &str,
    ) -> Result<String, OAuthError> {
        let code_challenge = pkce::generate_code_challenge(code_verifier);
        let mut url = Url::parse(&self.endpoint("authorize"))
            .map_err(|e| OAuthError::Config(format!("invalid authorize URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scope)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.into())
    }

    // =========================================================================
    // Token endpoint
    // =========================================================================

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(self.endpoint("token"))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        Ok(response.json::<TokenResponse>().await?)
    }

    /// Trade a refresh token for a new access token.
    ///
    /// The client authenticates with HTTP Basic credentials.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, OAuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", self.scope.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.endpoint("token"))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token refresh").await?;
        Ok(response.json::<TokenResponse>().await?)
    }

    // =========================================================================
    // Userinfo
    // =========================================================================

    /// Fetch the identity claims for an access token.
    pub async fn user_info(&self, access_token: &str) -> Result<Identity, OAuthError> {
        let response = self
            .http
            .get(self.endpoint("userinfo"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        Ok(response.json::<Identity>().await?)
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, OAuthError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(OAuthError::Endpoint {
            operation,
            status,
            detail: describe_error(&body),
        })
    }
}

/// Prefer the IdP's `error_description` over the raw body.
pub(crate) fn describe_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error_description")
                .or_else(|| v.get("error"))
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

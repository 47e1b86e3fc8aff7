//! OAuth wire and session types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authorization redirect plus the PKCE values to keep until the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Userinfo claims as returned by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub Map<String, Value>);

impl Identity {
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn subject(&self) -> Option<&str> {
        self.claim("sub")
    }

    pub fn email(&self) -> Option<&str> {
        self.claim("email")
    }

    /// Name the warehouse knows this user by.
    pub fn login_name(&self) -> &str {
        self.email()
            .or_else(|| self.claim("preferred_username"))
            .unwrap_or("unknown")
    }

    pub fn display_name(&self) -> &str {
        self.claim("name").unwrap_or_else(|| self.login_name())
    }
}

/// Query parameters the identity provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Extract callback parameters from a full redirect URL.
    pub fn from_redirect_url(redirect: &str) -> Result<Self, url::ParseError> {
        let url = url::Url::parse(redirect.trim())?;
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        Ok(params)
    }
}

//! Configuration structures
//!
//! Only endpoint and presentation settings live here. Credentials, scopes and
//! the loopback port are per-call inputs and are never configured.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APPLICATION_NAME, DEFAULT_AUTHORIZATION_URL, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_LOOPBACK_PATH, DEFAULT_TOKEN_URL, DEFAULT_USERINFO_URL,
};

/// Desktop OAuth client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopOAuthConfig {
    pub endpoints: OAuthEndpoints,
    pub loopback: LoopbackConfig,
    pub http: HttpConfig,
}

/// Provider endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthEndpoints {
    /// Authorization page opened in the browser (query string is appended)
    pub authorization_url: String,
    /// Token endpoint for refresh and code exchange
    pub token_url: String,
    /// Identity endpoint prefix; the access token is appended verbatim
    pub userinfo_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorization_url: DEFAULT_AUTHORIZATION_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
        }
    }
}

/// Loopback redirect settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    pub path: String,
    /// Name shown on the acknowledgment page ("Return to ..., please.")
    pub application_name: String,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_LOOPBACK_PATH.to_string(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS, user_agent: None }
    }
}

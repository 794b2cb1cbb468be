//! OAuth data types shared by the transport, flow and facade layers

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::StatusKind;

/// Client ID / secret pair of the desktop application registration.
///
/// Supplied per call and never cached.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Access token with its absolute expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for API calls
    pub access_token: String,

    /// Present for code exchange responses, absent for refresh responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry as a Unix timestamp (seconds)
    pub expires_on: i64,
}

impl TokenSet {
    /// Build a token set from a provider-relative lifetime.
    ///
    /// `expires_on` is `requested_at + expires_in`; negative lifetimes are
    /// clamped to zero.
    #[must_use]
    pub fn from_lifetime(
        access_token: String,
        refresh_token: Option<String>,
        requested_at: i64,
        expires_in: i64,
    ) -> Self {
        let expires_on = requested_at.max(0).saturating_add(expires_in.max(0));
        Self { access_token, refresh_token, expires_on }
    }

    /// Check if the access token is expired or will expire within
    /// `threshold_seconds` of `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64, threshold_seconds: i64) -> bool {
        now.saturating_add(threshold_seconds) >= self.expires_on
    }

    #[must_use]
    pub fn seconds_until_expiry(&self, now: i64) -> i64 {
        self.expires_on.saturating_sub(now)
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Query parameters of the loopback redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationQuery {
    /// The user granted access; the code is redeemable for tokens
    Code(String),

    /// The provider reported an error (e.g. `access_denied`)
    Error(String),
}

impl AuthorizationQuery {
    /// Interpret redirect parameters. `code` wins when present; otherwise
    /// the redirect is a failure, with an empty error when the provider sent
    /// neither field.
    #[must_use]
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        match params.get("code") {
            Some(code) => Self::Code(code.clone()),
            None => Self::Error(params.get("error").cloned().unwrap_or_default()),
        }
    }

    #[must_use]
    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }
}

/// Parsed JSON object returned by an OAuth endpoint.
///
/// Anything that is not a JSON object (including an unparsable body) is
/// represented by the empty document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDocument(Map<String, Value>);

impl JsonDocument {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::empty(),
        }
    }

    /// String field, `None` when missing or not a string.
    #[must_use]
    pub fn try_get_string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer field, `None` when missing or not an integer.
    #[must_use]
    pub fn try_get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Classified outcome of a request to an OAuth endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(JsonDocument),
    Failure(StatusKind),
}

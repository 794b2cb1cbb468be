//! Transport port used by the OAuth components.
//!
//! The OAuth layer only needs "send a request, get status + body + whether
//! the exchange happened at all". Keeping that behind a trait lets the
//! classifier and flows run against scripted responses in tests.

use async_trait::async_trait;
use loopauth_domain::constants::CONTENT_TYPE_FORM;
use reqwest::Method;

/// Outbound request description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::GET, url: url.into(), headers: Vec::new(), body: None }
    }

    /// Form-encoded POST with the given fields.
    #[must_use]
    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), CONTENT_TYPE_FORM.to_string())],
            body: Some(encode_pairs(fields)),
        }
    }

    /// Look up a header value (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw outcome of a request, before any OAuth interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// `false` when no HTTP response was obtained (connect failure, timeout,
    /// truncated body)
    pub succeeded: bool,
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl TransportResponse {
    #[must_use]
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { succeeded: true, status, content_type: content_type.into(), body: body.into() }
    }

    #[must_use]
    pub fn connection_failed() -> Self {
        Self { succeeded: false, status: 0, content_type: String::new(), body: Vec::new() }
    }
}

/// Async "send request, get response" primitive.
///
/// Implementations never fail: transport-level problems are reported through
/// [`TransportResponse::succeeded`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> TransportResponse;
}

/// `application/x-www-form-urlencoded` encoding of key/value pairs. Also used
/// for the authorization URL query string.
#[must_use]
pub fn encode_pairs(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

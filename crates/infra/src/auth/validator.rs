//! Access token validation against the identity endpoint.

use std::sync::Arc;

use loopauth_domain::{RequestOutcome, StatusKind};
use tracing::info;

use super::classifier::classify;
use crate::http::{HttpTransport, TransportRequest};

#[derive(Clone)]
pub struct AccessTokenValidator {
    transport: Arc<dyn HttpTransport>,
    userinfo_url: String,
}

impl AccessTokenValidator {
    /// `userinfo_url` is a prefix; the URL-encoded token is appended to it.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, userinfo_url: impl Into<String>) -> Self {
        Self { transport, userinfo_url: userinfo_url.into() }
    }

    /// Probe the identity endpoint with `access_token`.
    ///
    /// Any 2xx JSON response means the token is usable; the document itself
    /// is not inspected. Failures are returned as classified.
    pub async fn validate(&self, access_token: &str) -> StatusKind {
        let url = format!("{}{}", self.userinfo_url, urlencoding::encode(access_token));

        match classify(&self.transport.send(TransportRequest::get(url)).await) {
            RequestOutcome::Success(_) => {
                info!("The access token is valid");
                StatusKind::Success
            }
            RequestOutcome::Failure(kind) => {
                info!(status = %kind, "The access token could not be validated");
                kind
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::http::TransportResponse;
    use crate::testing::ScriptedTransport;

    fn validator(transport: &Arc<ScriptedTransport>) -> AccessTokenValidator {
        AccessTokenValidator::new(transport.clone(), "https://id.test/userinfo?access_token=")
    }

    #[tokio::test]
    async fn appends_encoded_token_to_identity_url() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, r#"{"sub":"1"}"#);

        assert_eq!(validator(&transport).validate("ya29.a/b+c").await, StatusKind::Success);

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].url, "https://id.test/userinfo?access_token=ya29.a%2Fb%2Bc");
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn any_json_success_is_valid() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, "");
        transport.push_json(200, "[1,2]");

        assert_eq!(validator(&transport).validate("t").await, StatusKind::Success);
        assert_eq!(validator(&transport).validate("t").await, StatusKind::Success);
    }

    #[tokio::test]
    async fn failures_propagate_unchanged() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(401, r#"{"error":"invalid_token"}"#);
        transport.push(TransportResponse::new(200, "text/html", "<html/>"));
        transport.push(TransportResponse::connection_failed());

        let validator = validator(&transport);
        assert_eq!(validator.validate("t").await, StatusKind::UnknownError);
        assert_eq!(validator.validate("t").await, StatusKind::UnsupportedContentType);
        assert_eq!(validator.validate("t").await, StatusKind::ConnectionError);
    }
}

//! Token endpoint requests: refresh grant and authorization code exchange.
//!
//! Both requests are request-scoped: the client holds no mutable state, so
//! any number of them may be in flight at once.

use std::sync::Arc;

use loopauth_domain::constants::{
    FIELD_ACCESS_TOKEN, FIELD_CLIENT_ID, FIELD_CLIENT_SECRET, FIELD_CODE, FIELD_EXPIRES_IN,
    FIELD_GRANT_TYPE, FIELD_REDIRECT_URI, FIELD_REFRESH_TOKEN, GRANT_TYPE_AUTHORIZATION_CODE,
    GRANT_TYPE_REFRESH_TOKEN,
};
use loopauth_domain::{ClientCredentials, JsonDocument, RequestOutcome, StatusKind, TokenSet};
use tracing::{error, info};

use super::classifier::classify;
use crate::http::{HttpTransport, TransportRequest};
use crate::time::Clock;

/// Client for the provider's token endpoint.
#[derive(Clone)]
pub struct TokenEndpointClient {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    token_url: String,
}

impl TokenEndpointClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        token_url: impl Into<String>,
    ) -> Self {
        Self { transport, clock, token_url: token_url.into() }
    }

    /// Refresh an access token.
    ///
    /// The response must carry `access_token` and `expires_in`; the returned
    /// set has no refresh token.
    ///
    /// # Errors
    /// The classified failure, or `InvalidResponseFormat` when a 2xx document
    /// lacks a required field.
    pub async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenSet, StatusKind> {
        let request = TransportRequest::post_form(
            &self.token_url,
            &[
                (FIELD_CLIENT_ID, credentials.client_id.as_str()),
                (FIELD_CLIENT_SECRET, credentials.client_secret.as_str()),
                (FIELD_REFRESH_TOKEN, refresh_token),
                (FIELD_GRANT_TYPE, GRANT_TYPE_REFRESH_TOKEN),
            ],
        );

        let requested_at = self.clock.unix_now();
        let result = match classify(&self.transport.send(request).await) {
            RequestOutcome::Success(document) => read_refresh_response(&document, requested_at),
            RequestOutcome::Failure(kind) => Err(kind),
        };

        match &result {
            Ok(_) => info!("The access token has been successfully refreshed"),
            Err(kind) => info!(status = %kind, "The access token failed to refresh"),
        }
        result
    }

    /// Redeem an authorization code received on the loopback redirect.
    ///
    /// `redirect_uri` must be the exact URI sent in the authorization
    /// request. The response must carry `access_token`, `refresh_token` and
    /// `expires_in`.
    ///
    /// # Errors
    /// The classified failure, or `InvalidResponseFormat` when a 2xx document
    /// lacks a required field.
    pub async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, StatusKind> {
        let request = TransportRequest::post_form(
            &self.token_url,
            &[
                (FIELD_CODE, code),
                (FIELD_CLIENT_ID, credentials.client_id.as_str()),
                (FIELD_CLIENT_SECRET, credentials.client_secret.as_str()),
                (FIELD_REDIRECT_URI, redirect_uri),
                (FIELD_GRANT_TYPE, GRANT_TYPE_AUTHORIZATION_CODE),
            ],
        );

        let requested_at = self.clock.unix_now();
        let result = match classify(&self.transport.send(request).await) {
            RequestOutcome::Success(document) => read_exchange_response(&document, requested_at),
            RequestOutcome::Failure(kind) => Err(kind),
        };

        match &result {
            Ok(_) => info!("The code exchange was successfully completed"),
            Err(kind) => info!(status = %kind, "The code exchange failed"),
        }
        result
    }
}

fn read_refresh_response(document: &JsonDocument, requested_at: i64) -> Result<TokenSet, StatusKind> {
    let (Some(access_token), Some(expires_in)) = (
        document.try_get_string(FIELD_ACCESS_TOKEN),
        document.try_get_i64(FIELD_EXPIRES_IN),
    ) else {
        error!(
            fields = ?[FIELD_ACCESS_TOKEN, FIELD_EXPIRES_IN],
            "Unable to extract required fields from the refresh response, aborting"
        );
        return Err(StatusKind::InvalidResponseFormat);
    };

    Ok(TokenSet::from_lifetime(access_token.to_string(), None, requested_at, expires_in))
}

fn read_exchange_response(
    document: &JsonDocument,
    requested_at: i64,
) -> Result<TokenSet, StatusKind> {
    let (Some(access_token), Some(refresh_token), Some(expires_in)) = (
        document.try_get_string(FIELD_ACCESS_TOKEN),
        document.try_get_string(FIELD_REFRESH_TOKEN),
        document.try_get_i64(FIELD_EXPIRES_IN),
    ) else {
        error!(
            fields = ?[FIELD_ACCESS_TOKEN, FIELD_REFRESH_TOKEN, FIELD_EXPIRES_IN],
            "Unable to extract required fields from the code exchange response, aborting"
        );
        return Err(StatusKind::InvalidResponseFormat);
    };

    Ok(TokenSet::from_lifetime(
        access_token.to_string(),
        Some(refresh_token.to_string()),
        requested_at,
        expires_in,
    ))
}

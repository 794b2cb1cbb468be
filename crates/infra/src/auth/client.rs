//! `OAuthDesktopClient`: the public entry point for desktop applications.
//!
//! Every operation comes in two shapes: an `async fn` returning the result,
//! and a continuation form that spawns on the ambient tokio runtime and
//! invokes the callback exactly once.

use std::sync::Arc;

use loopauth_domain::{ClientCredentials, DesktopOAuthConfig, LoopauthError, StatusKind, TokenSet};
use tokio::runtime::Handle;
use tracing::error;

use super::flow::{FlowContext, FlowResult, ManualAuthorizationFlow};
use super::token_endpoint::TokenEndpointClient;
use super::validator::AccessTokenValidator;
use crate::config::validate as validate_config;
use crate::http::{HttpClient, HttpTransport};
use crate::loopback::{AcknowledgmentPages, LoopbackCallbackServer};
use crate::platform::{SystemBrowser, UrlOpener};
use crate::time::{Clock, SystemClock};

/// Result delivered to token continuations.
pub type TokenResult = Result<TokenSet, StatusKind>;

#[derive(Clone)]
pub struct OAuthDesktopClient {
    token_endpoint: TokenEndpointClient,
    validator: AccessTokenValidator,
    flows: FlowContext,
}

impl OAuthDesktopClient {
    #[must_use]
    pub fn builder() -> OAuthDesktopClientBuilder {
        OAuthDesktopClientBuilder::default()
    }

    /// Client with production collaborators.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: DesktopOAuthConfig) -> Result<Self, LoopauthError> {
        Self::builder().config(config).build()
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> TokenResult {
        self.token_endpoint.refresh(credentials, refresh_token).await
    }

    /// Continuation form of [`Self::refresh_access_token`].
    pub fn refresh_auth_token<F>(
        &self,
        credentials: ClientCredentials,
        refresh_token: impl Into<String>,
        callback: F,
    ) where
        F: FnOnce(TokenResult) + Send + 'static,
    {
        let Some(runtime) = ambient_runtime() else {
            callback(Err(StatusKind::UnknownError));
            return;
        };

        let endpoint = self.token_endpoint.clone();
        let refresh_token = refresh_token.into();
        runtime.spawn(async move {
            callback(endpoint.refresh(&credentials, &refresh_token).await);
        });
    }

    /// Check an access token against the identity endpoint.
    pub async fn validate_access_token(&self, access_token: &str) -> StatusKind {
        self.validator.validate(access_token).await
    }

    /// Continuation form of [`Self::validate_access_token`].
    pub fn check_access_token<F>(&self, access_token: impl Into<String>, callback: F)
    where
        F: FnOnce(StatusKind) + Send + 'static,
    {
        let Some(runtime) = ambient_runtime() else {
            callback(StatusKind::UnknownError);
            return;
        };

        let validator = self.validator.clone();
        let access_token = access_token.into();
        runtime.spawn(async move {
            callback(validator.validate(&access_token).await);
        });
    }

    /// Prepare an interactive login redirecting to `127.0.0.1:<port>`.
    ///
    /// Nothing happens until [`ManualAuthorizationFlow::run`] is awaited.
    #[must_use]
    pub fn manual_flow(
        &self,
        credentials: ClientCredentials,
        scopes: &str,
        port: u16,
    ) -> ManualAuthorizationFlow {
        ManualAuthorizationFlow::new(self.flows.clone(), credentials, scopes, port)
    }

    /// Continuation form of [`Self::manual_flow`].
    ///
    /// A login that is superseded by a later call never invokes its
    /// callback.
    pub fn authenticate_manually<F>(
        &self,
        credentials: ClientCredentials,
        scopes: &str,
        port: u16,
        callback: F,
    ) where
        F: FnOnce(TokenResult) + Send + 'static,
    {
        let Some(runtime) = ambient_runtime() else {
            callback(Err(StatusKind::UnknownError));
            return;
        };

        let flow = self.manual_flow(credentials, scopes, port);
        runtime.spawn(async move {
            if let FlowResult::Completed(result) = flow.run().await {
                callback(result);
            }
        });
    }

    /// Loopback server shared by every login started from this client.
    #[must_use]
    pub fn loopback(&self) -> &Arc<LoopbackCallbackServer> {
        self.flows.loopback()
    }

    /// Stop the loopback listener. Any waiting login is superseded.
    ///
    /// # Errors
    /// Returns error if the listener task panicked.
    pub async fn shutdown(&self) -> Result<(), LoopauthError> {
        self.flows.loopback().shutdown().await
    }
}

fn ambient_runtime() -> Option<Handle> {
    match Handle::try_current() {
        Ok(handle) => Some(handle),
        Err(err) => {
            error!(error = %err, "No async runtime available for the OAuth request");
            None
        }
    }
}

/// Builder for [`OAuthDesktopClient`]. Unset collaborators default to the
/// production implementations.
#[derive(Default)]
pub struct OAuthDesktopClientBuilder {
    config: DesktopOAuthConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    opener: Option<Arc<dyn UrlOpener>>,
    clock: Option<Arc<dyn Clock>>,
}

impl OAuthDesktopClientBuilder {
    #[must_use]
    pub fn config(mut self, config: DesktopOAuthConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    /// Returns `ConfigError` for an invalid configuration, or the HTTP
    /// client construction error when no transport was supplied.
    pub fn build(self) -> Result<OAuthDesktopClient, LoopauthError> {
        let Self { config, transport, opener, clock } = self;
        validate_config(&config)?;

        let transport: Arc<dyn HttpTransport> = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpClient::from_config(&config.http)?),
        };
        let opener: Arc<dyn UrlOpener> = match opener {
            Some(opener) => opener,
            None => Arc::new(SystemBrowser),
        };
        let clock: Arc<dyn Clock> = match clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let token_endpoint =
            TokenEndpointClient::new(transport.clone(), clock, config.endpoints.token_url);
        let validator = AccessTokenValidator::new(transport, config.endpoints.userinfo_url);
        let flows = FlowContext::new(
            token_endpoint.clone(),
            Arc::new(LoopbackCallbackServer::new()),
            opener,
            AcknowledgmentPages::new(config.loopback.application_name),
            config.endpoints.authorization_url,
            config.loopback.path,
        );

        Ok(OAuthDesktopClient { token_endpoint, validator, flows })
    }
}

//! Interactive authorization-code flow over a loopback redirect.
//!
//! One [`ManualAuthorizationFlow`] per login attempt:
//!
//! ```text
//! Idle -> AuthorizationLaunched -> AwaitingRedirect
//!      -> CodeReceived -> Exchanging -> Succeeded | Failed
//!      -> ErrorReceived -> Failed
//!      -> Superseded (another flow took the loopback route)
//! ```
//!
//! The redirect handler only forwards the parsed query over a oneshot
//! channel; everything after that runs on the flow's own task.

use std::fmt;
use std::sync::Arc;

use loopauth_domain::constants::{
    FIELD_CLIENT_ID, FIELD_REDIRECT_URI, FIELD_RESPONSE_TYPE, FIELD_SCOPE, LOOPBACK_ADDRESS_BASE,
    RESPONSE_TYPE_CODE,
};
use loopauth_domain::{AuthorizationQuery, ClientCredentials, StatusKind, TokenSet};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::token_endpoint::TokenEndpointClient;
use crate::http::encode_pairs;
use crate::loopback::{AcknowledgmentPages, CallbackHandler, LoopbackCallbackServer, RouteToken};
use crate::platform::UrlOpener;

/// Collaborators shared by every flow started from the same client.
#[derive(Clone)]
pub struct FlowContext {
    token_endpoint: TokenEndpointClient,
    loopback: Arc<LoopbackCallbackServer>,
    opener: Arc<dyn UrlOpener>,
    pages: AcknowledgmentPages,
    authorization_url: String,
    loopback_path: String,
}

impl FlowContext {
    #[must_use]
    pub fn new(
        token_endpoint: TokenEndpointClient,
        loopback: Arc<LoopbackCallbackServer>,
        opener: Arc<dyn UrlOpener>,
        pages: AcknowledgmentPages,
        authorization_url: impl Into<String>,
        loopback_path: impl Into<String>,
    ) -> Self {
        Self {
            token_endpoint,
            loopback,
            opener,
            pages,
            authorization_url: authorization_url.into(),
            loopback_path: loopback_path.into(),
        }
    }

    #[must_use]
    pub fn loopback(&self) -> &Arc<LoopbackCallbackServer> {
        &self.loopback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AuthorizationLaunched,
    AwaitingRedirect,
    CodeReceived,
    ErrorReceived,
    Exchanging,
    Succeeded,
    Failed(StatusKind),
    Superseded,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::AuthorizationLaunched => f.write_str("authorization_launched"),
            Self::AwaitingRedirect => f.write_str("awaiting_redirect"),
            Self::CodeReceived => f.write_str("code_received"),
            Self::ErrorReceived => f.write_str("error_received"),
            Self::Exchanging => f.write_str("exchanging"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
            Self::Superseded => f.write_str("superseded"),
        }
    }
}

/// Terminal result of [`ManualAuthorizationFlow::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    Completed(Result<TokenSet, StatusKind>),
    /// The loopback route was taken over before a redirect arrived. No
    /// result is reported for this flow.
    Superseded,
}

pub struct ManualAuthorizationFlow {
    context: FlowContext,
    credentials: ClientCredentials,
    port: u16,
    redirect_uri: String,
    authorization_url: String,
    route: Option<RouteToken>,
    state: FlowState,
}

impl ManualAuthorizationFlow {
    #[must_use]
    pub fn new(
        context: FlowContext,
        credentials: ClientCredentials,
        scopes: &str,
        port: u16,
    ) -> Self {
        let redirect_uri = format!("{LOOPBACK_ADDRESS_BASE}{port}{}", context.loopback_path);
        let query = encode_pairs(&[
            (FIELD_SCOPE, scopes),
            (FIELD_RESPONSE_TYPE, RESPONSE_TYPE_CODE),
            (FIELD_REDIRECT_URI, redirect_uri.as_str()),
            (FIELD_CLIENT_ID, credentials.client_id.as_str()),
        ]);
        let separator = if context.authorization_url.contains('?') { '&' } else { '?' };
        let authorization_url = format!("{}{separator}{query}", context.authorization_url);

        Self {
            context,
            credentials,
            port,
            redirect_uri,
            authorization_url,
            route: None,
            state: FlowState::Idle,
        }
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// URL the user has to visit; useful when no browser could be launched.
    #[must_use]
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Drive the flow to a terminal state.
    pub async fn run(mut self) -> FlowResult {
        self.transition(FlowState::AuthorizationLaunched);
        if let Err(err) = self.context.opener.open(&self.authorization_url) {
            warn!(error = %err, "Unable to open the authorization page, the user has to open it manually");
        }

        let (redirect_tx, redirect_rx) = oneshot::channel();
        let pages = self.context.pages.clone();
        let handler: CallbackHandler = Box::new(move |query| {
            let page = pages.for_query(&query);
            let _ = redirect_tx.send(query);
            page
        });

        let bound =
            self.context.loopback.bind(self.port, &self.context.loopback_path, handler).await;
        match bound {
            Ok(token) => self.route = Some(token),
            Err(err) => {
                error!(error = %err, port = self.port, "Unable to start the loopback redirect listener");
                return self.finish(Err(StatusKind::UnknownError));
            }
        }
        self.transition(FlowState::AwaitingRedirect);

        let Ok(query) = redirect_rx.await else {
            self.route = None;
            self.transition(FlowState::Superseded);
            info!("The authorization flow was superseded by a newer one");
            return FlowResult::Superseded;
        };

        let result = match query {
            AuthorizationQuery::Code(code) => {
                self.transition(FlowState::CodeReceived);
                self.transition(FlowState::Exchanging);
                self.context
                    .token_endpoint
                    .exchange_code(&self.credentials, &code, &self.redirect_uri)
                    .await
            }
            AuthorizationQuery::Error(reason) => {
                self.transition(FlowState::ErrorReceived);
                warn!(error = %reason, "The authorization was denied or failed");
                Err(StatusKind::InvalidGrant)
            }
        };

        self.finish(result)
    }

    fn finish(&mut self, result: Result<TokenSet, StatusKind>) -> FlowResult {
        if let Some(token) = self.route.take() {
            self.context.loopback.unbind(token);
        }
        match &result {
            Ok(_) => self.transition(FlowState::Succeeded),
            Err(kind) => self.transition(FlowState::Failed(*kind)),
        }
        FlowResult::Completed(result)
    }

    fn transition(&mut self, next: FlowState) {
        debug!(from = %self.state, to = %next, "Authorization flow transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::testing::{free_port, wait_for_route, FixedClock, RecordingOpener, ScriptedTransport};

    const T: i64 = 1_700_000_000;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        opener: Arc<RecordingOpener>,
        loopback: Arc<LoopbackCallbackServer>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_opener(RecordingOpener::new())
        }

        fn with_opener(opener: RecordingOpener) -> Self {
            Self::with_parts(ScriptedTransport::new(), opener)
        }

        fn with_parts(transport: ScriptedTransport, opener: RecordingOpener) -> Self {
            Self {
                transport: Arc::new(transport),
                opener: Arc::new(opener),
                loopback: Arc::new(LoopbackCallbackServer::new()),
            }
        }

        fn flow(&self, port: u16) -> ManualAuthorizationFlow {
            let context = FlowContext::new(
                TokenEndpointClient::new(
                    self.transport.clone(),
                    Arc::new(FixedClock::new(T)),
                    "https://oauth.test/token",
                ),
                self.loopback.clone(),
                self.opener.clone(),
                AcknowledgmentPages::new("Test App"),
                "https://oauth.test/auth",
                "/google_oauth",
            );
            ManualAuthorizationFlow::new(
                context,
                ClientCredentials::new("client-id", "client-secret"),
                "openid email",
                port,
            )
        }

        async fn wait_until_bound(&self) -> RouteToken {
            wait_for_route(&self.loopback, None).await
        }
    }

    async fn redirect(port: u16, query: &str) -> String {
        reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap()
            .get(format!("http://127.0.0.1:{port}/google_oauth?{query}"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    #[test]
    fn builds_authorization_url_and_redirect_uri() {
        let harness = Harness::new();
        let flow = harness.flow(8080);

        assert_eq!(flow.redirect_uri(), "http://127.0.0.1:8080/google_oauth");
        assert_eq!(
            flow.authorization_url(),
            "https://oauth.test/auth?scope=openid%20email&response_type=code\
             &redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fgoogle_oauth&client_id=client-id"
        );
        assert_eq!(flow.state(), FlowState::Idle);
    }

    #[tokio::test]
    async fn code_redirect_is_exchanged_once() {
        let harness = Harness::new();
        harness
            .transport
            .push_json(200, r#"{"access_token":"A","refresh_token":"R","expires_in":3600}"#);
        let port = free_port();
        let flow = harness.flow(port);
        let expected_url = flow.authorization_url().to_string();

        let running = tokio::spawn(flow.run());
        harness.wait_until_bound().await;
        let page = redirect(port, "code=abc").await;
        let result = running.await.unwrap();

        assert!(page.contains("Authentication succeed. Return to Test App, please."));
        let FlowResult::Completed(Ok(tokens)) = result else {
            panic!("expected tokens, got {result:?}");
        };
        assert_eq!(tokens.access_token, "A");
        assert_eq!(tokens.refresh_token.as_deref(), Some("R"));
        assert_eq!(tokens.expires_on, T + 3600);

        let requests = harness.transport.requests();
        assert_eq!(requests.len(), 1);
        let body = requests[0].body.as_deref().unwrap();
        assert!(body.starts_with("code=abc&"));
        assert!(body.contains(&format!(
            "redirect_uri=http%3A%2F%2F127.0.0.1%3A{port}%2Fgoogle_oauth"
        )));

        assert_eq!(harness.opener.opened(), vec![expected_url]);
        assert!(!harness.loopback.has_route());
        harness.loopback.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn error_redirect_fails_without_exchange() {
        let harness = Harness::new();
        let port = free_port();

        let running = tokio::spawn(harness.flow(port).run());
        harness.wait_until_bound().await;
        let page = redirect(port, "error=access_denied").await;
        let result = running.await.unwrap();

        assert!(page.contains("Authentication failed. Return to Test App, please."));
        assert_eq!(result, FlowResult::Completed(Err(StatusKind::InvalidGrant)));
        assert!(harness.transport.requests().is_empty());
        harness.loopback.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn exchange_failure_is_propagated() {
        let harness = Harness::new();
        harness.transport.push_json(400, r#"{"error":"invalid_grant"}"#);
        let port = free_port();

        let running = tokio::spawn(harness.flow(port).run());
        harness.wait_until_bound().await;
        redirect(port, "code=stale").await;

        assert_eq!(
            running.await.unwrap(),
            FlowResult::Completed(Err(StatusKind::InvalidGrant))
        );
        harness.loopback.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn newer_flow_supersedes_waiting_one() {
        let harness = Harness::new();
        harness
            .transport
            .push_json(200, r#"{"access_token":"B","refresh_token":"R","expires_in":60}"#);
        let port = free_port();

        let first = tokio::spawn(harness.flow(port).run());
        let first_route = harness.wait_until_bound().await;
        let second = tokio::spawn(harness.flow(port).run());

        let first_result = timeout(Duration::from_secs(5), first).await.unwrap().unwrap();
        assert_eq!(first_result, FlowResult::Superseded);

        wait_for_route(&harness.loopback, Some(first_route)).await;
        redirect(port, "code=second").await;

        let FlowResult::Completed(Ok(tokens)) = second.await.unwrap() else {
            panic!("second flow should complete");
        };
        assert_eq!(tokens.access_token, "B");
        assert_eq!(harness.transport.requests().len(), 1);
        harness.loopback.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn in_flight_exchange_survives_newer_flow() {
        let release = Arc::new(Notify::new());
        let harness = Harness::with_parts(
            ScriptedTransport::gated(release.clone()),
            RecordingOpener::new(),
        );
        harness
            .transport
            .push_json(200, r#"{"access_token":"A","refresh_token":"R","expires_in":60}"#);
        let port = free_port();

        let first = tokio::spawn(harness.flow(port).run());
        let first_route = harness.wait_until_bound().await;
        redirect(port, "code=abc").await;
        timeout(Duration::from_secs(5), async {
            while harness.transport.requests().is_empty() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("code exchange never started");

        let second = tokio::spawn(harness.flow(port).run());
        let second_route = wait_for_route(&harness.loopback, Some(first_route)).await;
        release.notify_one();

        let first_result = timeout(Duration::from_secs(5), first).await.unwrap().unwrap();
        let FlowResult::Completed(Ok(tokens)) = first_result else {
            panic!("in-flight exchange should complete, got {first_result:?}");
        };
        assert_eq!(tokens.access_token, "A");
        assert_eq!(tokens.expires_on, T + 60);

        // The finished flow's unbind leaves the newer route in place.
        assert!(harness.loopback.has_route());
        assert!(harness.loopback.is_bound(second_route));

        redirect(port, "error=access_denied").await;
        assert_eq!(
            second.await.unwrap(),
            FlowResult::Completed(Err(StatusKind::InvalidGrant))
        );
        assert_eq!(harness.transport.requests().len(), 1);
        harness.loopback.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_unknown_error() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();
        let harness = Harness::new();

        let result = harness.flow(port).run().await;

        assert_eq!(result, FlowResult::Completed(Err(StatusKind::UnknownError)));
        assert!(harness.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn browser_failure_does_not_abort_flow() {
        let harness = Harness::with_opener(RecordingOpener::failing());
        let port = free_port();

        let running = tokio::spawn(harness.flow(port).run());
        harness.wait_until_bound().await;
        redirect(port, "error=access_denied").await;

        assert_eq!(
            running.await.unwrap(),
            FlowResult::Completed(Err(StatusKind::InvalidGrant))
        );
        assert_eq!(harness.opener.opened().len(), 1);
        harness.loopback.shutdown().await.unwrap();
    }
}

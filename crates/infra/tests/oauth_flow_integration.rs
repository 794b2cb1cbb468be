//! End-to-end tests of the desktop OAuth client against mock provider
//! endpoints and a real loopback listener.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loopauth_domain::constants::CONTENT_TYPE_HTML;
use loopauth_domain::{ClientCredentials, DesktopOAuthConfig, StatusKind};
use loopauth_infra::testing::{free_port, wait_for_route, RecordingOpener};
use loopauth_infra::{FlowResult, OAuthDesktopClient};
use tokio::time::timeout;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> DesktopOAuthConfig {
    let mut config = DesktopOAuthConfig::default();
    config.endpoints.authorization_url = format!("{}/authorize", server.uri());
    config.endpoints.token_url = format!("{}/token", server.uri());
    config.endpoints.userinfo_url = format!("{}/userinfo?access_token=", server.uri());
    config.loopback.application_name = "Integration".into();
    config.http.timeout_seconds = 5;
    config
}

fn client_for(server: &MockServer, opener: &Arc<RecordingOpener>) -> OAuthDesktopClient {
    OAuthDesktopClient::builder()
        .config(config_for(server))
        .opener(opener.clone())
        .build()
        .expect("client")
}

fn creds() -> ClientCredentials {
    ClientCredentials::new("desktop-client", "desktop-secret")
}

fn json(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json; charset=utf-8")
}

async fn browser_redirect(port: u16, query: &str) -> reqwest::Response {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("browser client")
        .get(format!("http://127.0.0.1:{port}/google_oauth?{query}"))
        .send()
        .await
        .expect("redirect request")
}

#[tokio::test]
async fn interactive_login_exchanges_code() {
    let server = MockServer::start().await;
    let port = free_port();
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("code=abc"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!(
            "redirect_uri=http%3A%2F%2F127.0.0.1%3A{port}%2Fgoogle_oauth"
        )))
        .respond_with(json(
            200,
            r#"{"access_token":"ya29.A","refresh_token":"1//R","expires_in":3599,"token_type":"Bearer"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let opener = Arc::new(RecordingOpener::new());
    let client = client_for(&server, &opener);
    let before = Utc::now().timestamp();

    let login = tokio::spawn(client.manual_flow(creds(), "openid email", port).run());
    wait_for_route(client.loopback(), None).await;

    let page = browser_redirect(port, "code=abc&scope=openid").await;
    assert!(page
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(CONTENT_TYPE_HTML)));
    let page = page.text().await.expect("page body");
    assert!(page.contains("<title>Authentication succeed</title>"));
    assert!(page.contains("Return to Integration, please."));

    let FlowResult::Completed(Ok(tokens)) = login.await.expect("login task") else {
        panic!("login should succeed");
    };
    assert_eq!(tokens.access_token, "ya29.A");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//R"));
    assert!(tokens.expires_on >= before + 3599);
    assert!(tokens.expires_on <= Utc::now().timestamp() + 3599);

    let opened = opener.opened();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].starts_with(&format!("{}/authorize?scope=openid%20email", server.uri())));
    assert!(opened[0].ends_with("&client_id=desktop-client"));

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn denied_login_skips_code_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(json(500, "{}"))
        .expect(0)
        .mount(&server)
        .await;

    let opener = Arc::new(RecordingOpener::new());
    let client = client_for(&server, &opener);
    let port = free_port();

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.authenticate_manually(creds(), "email", port, move |result| {
        let _ = tx.send(result);
    });
    wait_for_route(client.loopback(), None).await;

    let page = browser_redirect(port, "error=access_denied").await.text().await.expect("page");
    assert!(page.contains("<title>Authentication failed</title>"));

    let result = timeout(Duration::from_secs(5), rx).await.expect("callback").expect("sender");
    assert_eq!(result, Err(StatusKind::InvalidGrant));

    // A second redirect finds no route.
    let late = browser_redirect(port, "code=late").await;
    assert_eq!(late.status(), reqwest::StatusCode::NOT_FOUND);

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn refresh_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=good"))
        .respond_with(json(200, r#"{"access_token":"fresh","expires_in":600}"#))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=revoked"))
        .respond_with(json(
            400,
            r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, &Arc::new(RecordingOpener::new()));

    let tokens = client.refresh_access_token(&creds(), "good").await.expect("refresh");
    assert_eq!(tokens.access_token, "fresh");
    assert!(tokens.refresh_token.is_none());
    assert!(!tokens.is_expired(Utc::now().timestamp(), 60));

    let revoked = client.refresh_access_token(&creds(), "revoked").await;
    assert_eq!(revoked, Err(StatusKind::InvalidGrant));
}

#[tokio::test]
async fn refresh_rejects_html_error_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(502).set_body_raw("<html>Bad Gateway</html>", "text/html"))
        .mount(&server)
        .await;

    let client = client_for(&server, &Arc::new(RecordingOpener::new()));
    let result = client.refresh_access_token(&creds(), "R").await;
    assert_eq!(result, Err(StatusKind::UnsupportedContentType));
}

#[tokio::test]
async fn unreachable_provider_is_connection_error() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    let closed = free_port();
    config.endpoints.token_url = format!("http://127.0.0.1:{closed}/token");
    config.endpoints.userinfo_url = format!("http://127.0.0.1:{closed}/userinfo?access_token=");

    let client = OAuthDesktopClient::builder()
        .config(config)
        .opener(Arc::new(RecordingOpener::new()))
        .build()
        .expect("client");

    assert_eq!(client.refresh_access_token(&creds(), "R").await, Err(StatusKind::ConnectionError));
    assert_eq!(client.validate_access_token("T").await, StatusKind::ConnectionError);
}

#[tokio::test]
async fn validation_probes_identity_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(query_param("access_token", "good token"))
        .respond_with(json(200, r#"{"sub":"1234","email":"user@example.com"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(query_param("access_token", "expired"))
        .respond_with(json(401, r#"{"error":"invalid_token"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &Arc::new(RecordingOpener::new()));

    assert_eq!(client.validate_access_token("good token").await, StatusKind::Success);

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.check_access_token("expired", move |status| {
        let _ = tx.send(status);
    });
    assert_eq!(rx.await.expect("callback"), StatusKind::UnknownError);
}

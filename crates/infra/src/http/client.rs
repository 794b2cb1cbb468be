use std::time::Duration;

use async_trait::async_trait;
use loopauth_domain::{HttpConfig, LoopauthError};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::transport::{HttpTransport, TransportRequest, TransportResponse};
use crate::errors::InfraError;

/// reqwest-backed [`HttpTransport`].
///
/// Requests are sent exactly once. Retry policy belongs to the caller.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, LoopauthError> {
        Self::builder().build()
    }

    /// Build from the `http` section of the configuration.
    pub fn from_config(config: &HttpConfig) -> Result<Self, LoopauthError> {
        let mut builder = Self::builder().timeout(Duration::from_secs(config.timeout_seconds));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, reqwest::Error> {
        let mut builder = self.client.request(request.method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;

        Ok(TransportResponse::new(status, content_type, body.to_vec()))
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn send(&self, request: TransportRequest) -> TransportResponse {
        let method = request.method.clone();
        // The identity probe carries the access token in its query string.
        let target = request.url.split('?').next().unwrap_or_default().to_string();
        debug!(%method, url = %target, "sending HTTP request");

        match self.execute(request).await {
            Ok(response) => {
                debug!(%method, url = %target, status = response.status, "received HTTP response");
                response
            }
            Err(err) => {
                let mapped: LoopauthError = InfraError::from(err).into();
                debug!(%method, url = %target, error = %mapped, "HTTP request failed");
                TransportResponse::connection_failed()
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None, default_headers: None }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, LoopauthError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            LoopauthError::from(infra)
        })?;

        Ok(HttpClient { client })
    }
}

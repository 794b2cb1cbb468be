//! Test doubles for the OAuth ports.
//!
//! Compiled for unit tests and, with the `test-utils` feature, for the
//! integration tests under `tests/`.

use std::collections::VecDeque;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loopauth_domain::constants::CONTENT_TYPE_JSON;
use loopauth_domain::{LoopauthError, Result};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};

use crate::http::{HttpTransport, TransportRequest, TransportResponse};
use crate::loopback::{LoopbackCallbackServer, RouteToken};
use crate::platform::UrlOpener;
use crate::time::Clock;

/// Transport that replays queued responses and records every request.
///
/// Once the queue is empty every request fails at the transport level.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that records each request, then holds it until `gate`
    /// is notified once per request.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self { gate: Some(gate), ..Self::default() }
    }

    pub fn push(&self, response: TransportResponse) {
        self.responses.lock().push_back(response);
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.push(TransportResponse::new(status, CONTENT_TYPE_JSON, body));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> TransportResponse {
        self.requests.lock().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses.lock().pop_front().unwrap_or_else(TransportResponse::connection_failed)
    }
}

/// Clock frozen at a given Unix timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(i64);

impl FixedClock {
    pub fn new(unix_seconds: i64) -> Self {
        Self(unix_seconds)
    }
}

impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.0
    }
}

/// Opener that records URLs instead of launching anything.
#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// An opener whose every call fails after recording the URL.
    pub fn failing() -> Self {
        Self { opened: Mutex::new(Vec::new()), fail: true }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().push(url.to_string());
        if self.fail {
            return Err(LoopauthError::Platform("no browser available".into()));
        }
        Ok(())
    }
}

/// A loopback port that was free a moment ago.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap_or(0)
}

/// Wait until `server` has a bound route other than `previous`.
///
/// Panics after five seconds.
pub async fn wait_for_route(
    server: &LoopbackCallbackServer,
    previous: Option<RouteToken>,
) -> RouteToken {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(token) = server.current_route().filter(|token| Some(*token) != previous) {
            return token;
        }
        assert!(Instant::now() < deadline, "loopback route was never bound");
        sleep(Duration::from_millis(10)).await;
    }
}

//! Loopback HTTP server that receives OAuth redirect callbacks.
//!
//! The server owns at most one route. Binding a new route replaces the
//! previous one, dropping its handler; the listener itself is kept running
//! across binds on the same port.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use loopauth_domain::{AuthorizationQuery, LoopauthError, Result};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::InfraError;

/// Redirect handler: receives the parsed query, returns the HTML page for
/// the browser. Called at most once.
pub type CallbackHandler = Box<dyn FnOnce(AuthorizationQuery) -> String + Send + 'static>;

/// Identifies one bound route. Stale tokens are ignored by [`LoopbackCallbackServer::unbind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteToken(u64);

struct BoundRoute {
    token: RouteToken,
    path: String,
    handler: Option<CallbackHandler>,
}

type RouteSlot = Arc<Mutex<Option<BoundRoute>>>;

/// Owner of the single loopback route and its listener.
pub struct LoopbackCallbackServer {
    route: RouteSlot,
    listener: AsyncMutex<Option<Listener>>,
    next_token: AtomicU64,
}

impl Default for LoopbackCallbackServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackCallbackServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            route: Arc::new(Mutex::new(None)),
            listener: AsyncMutex::new(None),
            next_token: AtomicU64::new(1),
        }
    }

    /// Bind `handler` to `127.0.0.1:<port><path>` for GET and POST.
    ///
    /// Any previously bound route is unbound first. The listener is started
    /// if it is not already running on `port`.
    ///
    /// # Errors
    /// `InvalidInput` when the port is zero, `LoopbackError` when it cannot
    /// be listened on. The previous route stays unbound in the latter case.
    pub async fn bind(&self, port: u16, path: &str, handler: CallbackHandler) -> Result<RouteToken> {
        if port == 0 {
            return Err(LoopauthError::InvalidInput("loopback port must be non-zero".into()));
        }

        let mut listener = self.listener.lock().await;

        let previous = self.route.lock().take();
        if let Some(previous) = previous {
            debug!(token = previous.token.0, path = %previous.path, "Replacing bound loopback route");
        }

        let reusable = listener.as_ref().is_some_and(|running| running.port == port && running.is_alive());
        if !reusable {
            if let Some(stale) = listener.take() {
                debug!(port = stale.port, "Stopping loopback listener");
                stale.stop();
            }
            *listener = Some(Listener::start(port, self.route.clone()).await?);
        }

        let token = RouteToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        *self.route.lock() =
            Some(BoundRoute { token, path: path.to_string(), handler: Some(handler) });

        info!(port, path, "Loopback route bound");
        Ok(token)
    }

    /// Remove the route identified by `token`.
    ///
    /// Returns `false` when the route was already replaced or removed. The
    /// listener keeps running so a later bind on the same port is cheap.
    pub fn unbind(&self, token: RouteToken) -> bool {
        let mut slot = self.route.lock();
        match slot.as_ref() {
            Some(bound) if bound.token == token => {
                *slot = None;
                debug!(token = token.0, "Loopback route unbound");
                true
            }
            _ => false,
        }
    }

    /// Whether `token` is the currently bound route.
    #[must_use]
    pub fn is_bound(&self, token: RouteToken) -> bool {
        self.route.lock().as_ref().is_some_and(|bound| bound.token == token)
    }

    /// Token of the currently bound route.
    #[must_use]
    pub fn current_route(&self) -> Option<RouteToken> {
        self.route.lock().as_ref().map(|bound| bound.token)
    }

    /// Whether any route is currently bound.
    #[must_use]
    pub fn has_route(&self) -> bool {
        self.route.lock().is_some()
    }

    /// Port of the running listener, if any.
    pub async fn listening_port(&self) -> Option<u16> {
        self.listener.lock().await.as_ref().filter(|running| running.is_alive()).map(|running| running.port)
    }

    /// Drop the route and shut the listener down gracefully.
    ///
    /// # Errors
    /// Returns error if the server task panicked.
    pub async fn shutdown(&self) -> Result<()> {
        self.route.lock().take();
        let running = self.listener.lock().await.take();
        match running {
            Some(running) => running.shutdown().await,
            None => Ok(()),
        }
    }
}

struct Listener {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    async fn start(port: u16, route: RouteSlot) -> Result<Self> {
        let listener =
            TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await.map_err(|err| {
                let cause: LoopauthError = InfraError::from(err).into();
                LoopauthError::Loopback(format!(
                    "failed to bind OAuth loopback server on 127.0.0.1:{port}: {cause}"
                ))
            })?;

        let app = Router::new().fallback(handle_redirect).with_state(route);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("OAuth loopback server error: {}", err);
            }
        });

        info!(port, "OAuth loopback server listening");
        Ok(Self { port, shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Signal shutdown without waiting for in-flight connections.
    fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.take();
    }

    async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    return Err(LoopauthError::Internal(format!(
                        "OAuth loopback server panicked: {err}"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_redirect(
    State(route): State<RouteSlot>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::GET && method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let handler = {
        let mut slot = route.lock();
        match slot.as_mut() {
            Some(bound) if bound.path == uri.path() => bound.handler.take(),
            _ => return StatusCode::NOT_FOUND.into_response(),
        }
    };

    let Some(handler) = handler else {
        debug!(path = %uri.path(), "Ignoring repeated loopback redirect");
        return (StatusCode::GONE, "The authorization redirect was already handled.").into_response();
    };

    let query = AuthorizationQuery::from_params(&params);
    debug!(code_present = query.is_code(), "Loopback redirect received");
    Html(handler(query)).into_response()
}

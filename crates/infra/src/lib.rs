//! # Loopauth Infrastructure
//!
//! Every component of the desktop OAuth client that performs I/O.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport and its port trait
//! - Token endpoint, identity probe and interactive login flow
//! - The axum loopback server receiving the redirect
//! - System browser launch and configuration loading
//!
//! ## Architecture
//! - Data model and error taxonomy come from `loopauth-domain`
//! - External collaborators sit behind traits ([`HttpTransport`],
//!   [`UrlOpener`], [`Clock`]) so flows can run against test doubles

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod loopback;
pub mod platform;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used items
pub use auth::{
    classify, AccessTokenValidator, FlowResult, FlowState, ManualAuthorizationFlow,
    OAuthDesktopClient, OAuthDesktopClientBuilder, TokenEndpointClient, TokenResult,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpTransport, TransportRequest, TransportResponse};
pub use loopback::{AcknowledgmentPages, LoopbackCallbackServer, RouteToken};
pub use platform::{SystemBrowser, UrlOpener};
pub use time::{Clock, SystemClock};

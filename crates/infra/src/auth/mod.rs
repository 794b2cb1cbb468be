//! OAuth 2.0 installed-application client.
//!
//! Components, bottom-up:
//! - [`classifier`]: maps raw responses to [`loopauth_domain::RequestOutcome`]
//! - [`token_endpoint`]: refresh grant and code exchange
//! - [`validator`]: identity endpoint probe
//! - [`flow`]: interactive login over the loopback redirect
//! - [`client`]: the [`OAuthDesktopClient`] facade

pub mod classifier;
pub mod client;
pub mod flow;
pub mod token_endpoint;
pub mod validator;

pub use classifier::classify;
pub use client::{OAuthDesktopClient, OAuthDesktopClientBuilder, TokenResult};
pub use flow::{FlowContext, FlowResult, FlowState, ManualAuthorizationFlow};
pub use token_endpoint::TokenEndpointClient;
pub use validator::AccessTokenValidator;

//! Loopback redirect target for the installed-application flow.

pub mod page;
pub mod server;

pub use page::AcknowledgmentPages;
pub use server::{CallbackHandler, LoopbackCallbackServer, RouteToken};

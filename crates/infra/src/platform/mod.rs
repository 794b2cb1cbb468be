//! Platform integrations

pub mod browser;

pub use browser::{SystemBrowser, UrlOpener};

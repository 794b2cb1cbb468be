//! # Loopauth Domain
//!
//! Data model for the desktop OAuth2 client.
//!
//! This crate contains:
//! - OAuth data types (`TokenSet`, `ClientCredentials`, `AuthorizationQuery`)
//! - The `StatusKind` outcome taxonomy and the `LoopauthError` plumbing error
//! - Configuration structures and protocol constants
//!
//! ## Architecture
//! - No dependencies on other loopauth crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

//! Error types used throughout the workspace

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plumbing error for everything that is not an OAuth outcome: configuration,
/// listener setup, browser launch and client construction.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LoopauthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Loopback server error: {0}")]
    Loopback(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for loopauth plumbing operations
pub type Result<T> = std::result::Result<T, LoopauthError>;

/// Resulting status of an OAuth operation.
///
/// This is the closed set of outcomes handed to callers. Every transport,
/// format or provider failure is translated into exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Everything went well
    Success,

    /// The endpoint answered with a content type other than JSON
    UnsupportedContentType,

    /// The endpoint answered with a document missing required fields
    InvalidResponseFormat,

    /// The request could not complete due to connectivity problems
    ConnectionError,

    /// The refresh token is unusable, or the user denied the interactive
    /// authorization. Callers should fall back to the interactive flow.
    InvalidGrant,

    /// Any error not covered by the other kinds
    UnknownError,
}

impl StatusKind {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Stable numeric code, used as the CLI exit status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::UnsupportedContentType => 1,
            Self::InvalidResponseFormat => 2,
            Self::UnknownError => 3,
            Self::ConnectionError => 4,
            Self::InvalidGrant => 5,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::UnsupportedContentType => "unsupported response content type",
            Self::InvalidResponseFormat => "invalid response format",
            Self::ConnectionError => "connection error",
            Self::InvalidGrant => "invalid grant",
            Self::UnknownError => "unknown error",
        };
        f.write_str(text)
    }
}

impl std::error::Error for StatusKind {}
